/*
 *  sun.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
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
//! Sunrise/Sunset for a given lat/lon, date and horizon angle (NOAA algorithm).
//! Returns UTC times on the requested civil date.

use chrono::{prelude::*, Duration};
use thiserror::Error;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EphemerisError {
    #[error("sun stays below the horizon all day")]
    NeverUp,
    #[error("sun stays above the horizon all day")]
    AlwaysUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Sun crossing times for a location.
pub trait Ephemeris {
    /// `horizon_deg` is the sun's altitude at the crossing: -0.833 for the
    /// refraction-corrected horizon, 6 degrees lower for civil twilight.
    fn sun_times(
        &self,
        lat_deg: f64,
        lon_deg: f64,
        horizon_deg: f64,
        date: NaiveDate,
    ) -> Result<SunTimes, EphemerisError>;
}

/// NOAA sunrise equation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoaaEphemeris;

impl Ephemeris for NoaaEphemeris {
    fn sun_times(
        &self,
        lat_deg: f64,
        lon_deg: f64,
        horizon_deg: f64,
        date: NaiveDate,
    ) -> Result<SunTimes, EphemerisError> {
        let zenith = 90.0 - horizon_deg;
        let lng_hour = lon_deg / 15.0;
        let n = date.ordinal() as f64;

        let rise = compute_ut(lat_deg, lng_hour, n, zenith, true)?;
        let set = compute_ut(lat_deg, lng_hour, n, zenith, false)?;

        Ok(SunTimes {
            sunrise: ut_hours_to_utc(date, rise),
            sunset: ut_hours_to_utc(date, set),
        })
    }
}

#[inline]
fn sin_deg(x: f64) -> f64 { (x * DEG_TO_RAD).sin() }
#[inline]
fn cos_deg(x: f64) -> f64 { (x * DEG_TO_RAD).cos() }
#[inline]
fn tan_deg(x: f64) -> f64 { (x * DEG_TO_RAD).tan() }
#[inline]
fn acos_deg(x: f64) -> f64 { x.acos() * RAD_TO_DEG }
#[inline]
fn atan_deg(x: f64) -> f64 { x.atan() * RAD_TO_DEG }

/// Normalize angle to [0,360)
fn norm360(x: f64) -> f64 {
    x.rem_euclid(360.0)
}

fn compute_ut(lat_deg: f64, lng_hour: f64, n: f64, zenith: f64, is_rise: bool) -> Result<f64, EphemerisError> {
    // approximate time, 6h local solar for rising, 18h for setting
    let t = if is_rise {
        n + (6.0 - lng_hour) / 24.0
    } else {
        n + (18.0 - lng_hour) / 24.0
    };

    // mean anomaly, then true longitude
    let m = 0.9856 * t - 3.289;
    let l = norm360(m + 1.916 * sin_deg(m) + 0.020 * sin_deg(2.0 * m) + 282.634);

    // right ascension, same quadrant as L
    let mut ra = norm360(atan_deg(0.91764 * tan_deg(l)));
    let l_quadrant = (l / 90.0).floor() * 90.0;
    let ra_quadrant = (ra / 90.0).floor() * 90.0;
    ra = (ra + (l_quadrant - ra_quadrant)) / 15.0;

    let sin_dec = 0.39782 * sin_deg(l);
    let cos_dec = (1.0 - sin_dec * sin_dec).sqrt();

    let cos_h = (cos_deg(zenith) - sin_dec * sin_deg(lat_deg)) / (cos_dec * cos_deg(lat_deg));
    if cos_h > 1.0 {
        return Err(EphemerisError::NeverUp);
    }
    if cos_h < -1.0 {
        return Err(EphemerisError::AlwaysUp);
    }

    let h = (if is_rise { 360.0 - acos_deg(cos_h) } else { acos_deg(cos_h) }) / 15.0;

    let t_local = h + ra - (0.06571 * t) - 6.622;
    Ok((t_local - lng_hour).rem_euclid(24.0))
}

/// UT hours (0..24) to a UTC instant on the given civil date.
fn ut_hours_to_utc(date: NaiveDate, ut_hours: f64) -> DateTime<Utc> {
    let seconds = (ut_hours * 3600.0).round() as i64;
    let base = date.and_time(NaiveTime::MIN);
    DateTime::<Utc>::from_naive_utc_and_offset(base + Duration::seconds(seconds), Utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HORIZON: f64 = -0.833;

    fn minutes_between(a: DateTime<Utc>, h: u32, m: u32) -> i64 {
        let expected = a.date_naive().and_hms_opt(h, m, 0).unwrap().and_utc();
        (a - expected).num_minutes().abs()
    }

    #[test]
    fn test_london_midsummer() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        let t = NoaaEphemeris.sun_times(51.5074, -0.1278, HORIZON, date).unwrap();
        // published: 03:43 / 20:21 UTC
        assert!(minutes_between(t.sunrise, 3, 43) <= 3, "sunrise {}", t.sunrise);
        assert!(minutes_between(t.sunset, 20, 21) <= 3, "sunset {}", t.sunset);
    }

    #[test]
    fn test_lower_horizon_widens_the_day() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let day = NoaaEphemeris.sun_times(45.0, 10.0, HORIZON, date).unwrap();
        let civil = NoaaEphemeris.sun_times(45.0, 10.0, HORIZON - 6.0, date).unwrap();
        assert!(civil.sunrise < day.sunrise);
        assert!(civil.sunset > day.sunset);
        let dawn = (day.sunrise - civil.sunrise).num_minutes();
        assert!((20..=45).contains(&dawn), "civil dawn lasted {dawn} minutes");
    }

    #[test]
    fn test_polar_cases() {
        let winter = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
        let summer = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        assert_eq!(
            NoaaEphemeris.sun_times(69.65, 18.96, HORIZON, winter),
            Err(EphemerisError::NeverUp)
        );
        assert_eq!(
            NoaaEphemeris.sun_times(69.65, 18.96, HORIZON, summer),
            Err(EphemerisError::AlwaysUp)
        );
    }
}
