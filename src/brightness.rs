/*
 *  brightness.rs
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

use chrono::{DateTime, Local};
use log::{debug, warn};

use crate::astral::SolarEstimator;
use crate::config::DimmerConfig;
use crate::sensor::LightSensor;
use crate::sun::Ephemeris;

/// Sensor counts, brightest first, and the panel percent each maps to.
const LIGHT_IN: [f64; 5] = [2000.0, 500.0, 200.0, 50.0, 0.0];
const PERCENT_OUT: [f64; 5] = [100.0, 60.0, 40.0, 30.0, 20.0];

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BrightnessState {
    pub percent: u8,
    /// Last sensor reading, for telemetry
    pub last_light_value: Option<f64>,
}

/// Piecewise-linear map from a raw light count to a brightness percent.
pub fn light_to_percent(light: f64) -> u8 {
    let Some(i) = LIGHT_IN.iter().position(|&level| light >= level) else {
        // negative counts sit below the dimmest breakpoint
        return PERCENT_OUT[LIGHT_IN.len() - 1] as u8;
    };
    if i == 0 {
        return PERCENT_OUT[0] as u8;
    }
    let pct = (light - LIGHT_IN[i]) / (LIGHT_IN[i - 1] - LIGHT_IN[i]) * (PERCENT_OUT[i - 1] - PERCENT_OUT[i])
        + PERCENT_OUT[i];
    pct as u8
}

pub struct BrightnessController {
    sensor: Option<Box<dyn LightSensor>>,
    min_percent: f64,
    max_percent: f64,
    state: BrightnessState,
}

impl BrightnessController {
    pub fn new(sensor: Option<Box<dyn LightSensor>>, cfg: &DimmerConfig) -> Self {
        Self {
            sensor,
            min_percent: f64::from(cfg.min_brightness_percent),
            max_percent: f64::from(cfg.max_brightness_percent),
            state: BrightnessState::default(),
        }
    }

    pub fn state(&self) -> BrightnessState {
        self.state
    }

    #[cfg(test)]
    pub fn has_sensor(&self) -> bool {
        self.sensor.is_some()
    }

    /// Picks this tick's brightness. A sensor that fails once is dropped for good.
    pub fn update<E: Ephemeris>(&mut self, solar: &SolarEstimator<E>, now: DateTime<Local>) -> BrightnessState {
        if let Some(sensor) = self.sensor.as_mut() {
            match sensor.read_light() {
                Ok(light) => {
                    self.state = BrightnessState {
                        percent: light_to_percent(light),
                        last_light_value: Some(light),
                    };
                    debug!("Light {light} -> brightness {}%", self.state.percent);
                    return self.state;
                }
                Err(e) => {
                    warn!("Light sensor failed ({e}), falling back to sun position for brightness");
                    self.sensor = None;
                }
            }
        }

        let estimate = solar.estimate_brightness(now);
        let pct = self.min_percent + estimate * (self.max_percent - self.min_percent);
        self.state = BrightnessState {
            percent: pct.round().clamp(0.0, 100.0) as u8,
            last_light_value: None,
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::sensor::SensorError;
    use crate::sun::{EphemerisError, SunTimes};
    use chrono::{NaiveDate, TimeZone};
    use std::collections::VecDeque;

    struct Script(VecDeque<Result<f64, SensorError>>);

    impl LightSensor for Script {
        fn read_light(&mut self) -> Result<f64, SensorError> {
            self.0.pop_front().unwrap_or(Err(SensorError::Bus("empty".into())))
        }
    }

    /// Always daylight.
    struct Noon;

    impl Ephemeris for Noon {
        fn sun_times(&self, _: f64, _: f64, _: f64, _: NaiveDate) -> Result<SunTimes, EphemerisError> {
            Err(EphemerisError::AlwaysUp)
        }
    }

    /// Always night.
    struct Midnight;

    impl Ephemeris for Midnight {
        fn sun_times(&self, _: f64, _: f64, _: f64, _: NaiveDate) -> Result<SunTimes, EphemerisError> {
            Err(EphemerisError::NeverUp)
        }
    }

    fn location() -> Location {
        Location { latitude: 0.0, longitude: 0.0, horizon_deg: -0.833, sun_offset_minutes: 0 }
    }

    fn dimmer(min: i32, max: i32) -> DimmerConfig {
        DimmerConfig { min_brightness_percent: min, max_brightness_percent: max, ..DimmerConfig::default() }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_breakpoints() {
        assert_eq!(light_to_percent(2000.0), 100);
        assert_eq!(light_to_percent(50_000.0), 100);
        assert_eq!(light_to_percent(500.0), 60);
        assert_eq!(light_to_percent(0.0), 20);
        assert_eq!(light_to_percent(125.0), 35);
        assert_eq!(light_to_percent(1250.0), 80);
        assert_eq!(light_to_percent(-4.0), 20);
    }

    #[test]
    fn test_sensor_drives_brightness() {
        let sensor = Script(VecDeque::from([Ok(125.0)]));
        let mut ctl = BrightnessController::new(Some(Box::new(sensor)), &dimmer(20, 100));
        let solar = SolarEstimator::new(location(), Midnight);
        let state = ctl.update(&solar, now());
        assert_eq!(state, BrightnessState { percent: 35, last_light_value: Some(125.0) });
    }

    #[test]
    fn test_sensor_failure_falls_back_for_good() {
        let sensor = Script(VecDeque::from([
            Ok(2000.0),
            Err(SensorError::Bus("nack".into())),
            Ok(0.0),
        ]));
        let mut ctl = BrightnessController::new(Some(Box::new(sensor)), &dimmer(10, 90));
        let solar = SolarEstimator::new(location(), Noon);

        assert_eq!(ctl.update(&solar, now()).percent, 100);
        assert_eq!(ctl.update(&solar, now()).percent, 90);
        assert!(!ctl.has_sensor());
        // the queued reading is never consulted again
        assert_eq!(ctl.update(&solar, now()).percent, 90);
        // nothing to report once the sensor is gone
        assert_eq!(ctl.state().last_light_value, None);
    }

    #[test]
    fn test_estimator_scales_into_bounds() {
        let mut ctl = BrightnessController::new(None, &dimmer(20, 80));
        assert_eq!(ctl.update(&SolarEstimator::new(location(), Noon), now()).percent, 80);
        assert_eq!(ctl.update(&SolarEstimator::new(location(), Midnight), now()).percent, 20);
    }
}
