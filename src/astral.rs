/*
 *  astral.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Today's sun times, sun-above test and the sensorless brightness estimate
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use log::{debug, info};

use crate::location::Location;
use crate::sun::{Ephemeris, EphemerisError, NoaaEphemeris};

/// Civil twilight ends when the sun is 6 degrees below the horizon.
pub const CIVIL_TWILIGHT_DEG: f64 = 6.0;

/// Today's crossings at one horizon, and the instant they were computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolarData {
    pub sunrise: DateTime<Local>,
    pub sunset: DateTime<Local>,
    pub now: DateTime<Local>,
}

pub struct SolarEstimator<E: Ephemeris = NoaaEphemeris> {
    location: Location,
    ephemeris: E,
}

impl<E: Ephemeris> SolarEstimator<E> {
    pub fn new(location: Location, ephemeris: E) -> Self {
        info!("Sun calculations for location: {}", location);
        Self { location, ephemeris }
    }

    /// Sunrise and sunset on the local calendar day of `now`.
    ///
    /// Days without a crossing are reported relative to `now` so comparisons
    /// still work: a sun that never rises gets sunrise one second ahead and
    /// sunset one second behind, a sun that never sets the reverse.
    pub fn sun_times(&self, horizon_deg: f64, now: DateTime<Local>) -> SolarData {
        let today = now.date_naive();
        let tick = Duration::seconds(1);
        match self.ephemeris.sun_times(
            self.location.latitude,
            self.location.longitude,
            horizon_deg,
            today,
        ) {
            Ok(t) => SolarData {
                sunrise: on_day(t.sunrise, today),
                sunset: on_day(t.sunset, today),
                now,
            },
            Err(EphemerisError::NeverUp) => {
                debug!("Sun never reaches {horizon_deg}° on {today}");
                SolarData { sunrise: now + tick, sunset: now - tick, now }
            }
            Err(EphemerisError::AlwaysUp) => {
                debug!("Sun never drops below {horizon_deg}° on {today}");
                SolarData { sunrise: now - tick, sunset: now + tick, now }
            }
        }
    }

    /// Strictly between today's sunrise and sunset, less any configured terrain offset.
    pub fn is_sun_above(&self, now: DateTime<Local>) -> bool {
        let day = self.sun_times(self.location.horizon_deg, now);
        let offset = Duration::minutes(i64::from(self.location.sun_offset_minutes));
        day.sunrise + offset < now && now < day.sunset - offset
    }

    /// 0.0 at night, 1.0 between sunrise and sunset, linear through civil twilight.
    ///
    /// On white nights the sun sets but never leaves civil twilight. The twilight
    /// bounds then collapse onto `now`, so the ramp starts a second before `now` and
    /// the estimate stays near 0.0 until sunrise. Brightness therefore bottoms out at
    /// the configured minimum on those nights.
    pub fn estimate_brightness(&self, now: DateTime<Local>) -> f64 {
        let day = self.sun_times(self.location.horizon_deg, now);
        let dusk = self.sun_times(self.location.horizon_deg - CIVIL_TWILIGHT_DEG, now);

        if now <= dusk.sunrise || now >= dusk.sunset {
            return 0.0;
        }
        if day.sunrise <= now && now <= day.sunset {
            return 1.0;
        }

        let (elapsed, span) = if now < day.sunrise {
            (now - dusk.sunrise, day.sunrise - dusk.sunrise)
        } else {
            (dusk.sunset - now, dusk.sunset - day.sunset)
        };
        if span <= Duration::zero() {
            return 0.0;
        }
        let fraction = elapsed.num_milliseconds() as f64 / span.num_milliseconds() as f64;
        fraction.clamp(0.0, 1.0)
    }
}

/// The ephemeris answers per UTC date; pin the result to the local day.
fn on_day(t: DateTime<Utc>, day: NaiveDate) -> DateTime<Local> {
    let local = t.with_timezone(&Local);
    local + Duration::days((day - local.date_naive()).num_days())
}
