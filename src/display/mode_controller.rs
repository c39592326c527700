/*
 *  display/mode_controller.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display mode controller - picks high/low, UV, error or the after-hours
 *  blink from operating hours, the last acquisition and the sun
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use super::{DisplayMode, DisplayState};
use crate::acquire::Acquisition;
use crate::config::{Config, ConfigError, MAX_HIGH_LOW_SECONDS, OpenHours};
use chrono::NaiveTime;
use std::time::Duration;

/// Configuration for display mode controller
#[derive(Debug, Clone, PartialEq)]
pub struct ModeControllerConfig {
    /// When the display is in service
    pub hours: OpenHours,

    /// Show UV while the sun is up
    pub uv_enabled: bool,

    /// Hold the high/low panel before revealing UV
    pub show_high_low_first: bool,

    /// How long to hold it, at most 55 seconds
    pub high_low_seconds: u64,
}

impl Default for ModeControllerConfig {
    fn default() -> Self {
        Self {
            hours: OpenHours::AllDay,
            uv_enabled: true,
            show_high_low_first: false,
            high_low_seconds: 10,
        }
    }
}

impl ModeControllerConfig {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            hours: cfg.operating_hours.resolve()?,
            uv_enabled: cfg.uv.enabled,
            show_high_low_first: cfg.uv.show_high_low_first,
            high_low_seconds: cfg.uv.high_low_seconds.min(MAX_HIGH_LOW_SECONDS),
        })
    }
}

/// Display mode controller - owns the `DisplayState`
pub struct DisplayModeController {
    config: ModeControllerConfig,
    state: DisplayState,
    indicator_on: bool,
    reveal_pending: bool,
}

impl DisplayModeController {
    pub fn new(config: ModeControllerConfig) -> Self {
        Self {
            config,
            state: DisplayState::default(),
            indicator_on: false,
            reveal_pending: false,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn current_mode(&self) -> DisplayMode {
        self.state.mode
    }

    /// Whether `now` falls inside operating hours
    pub fn is_open(&self, now: NaiveTime) -> bool {
        self.config.hours.is_open(now)
    }

    /// Rule 1. Returns true on the first tick after closing, when the
    /// caller clears the screen and starts the blink.
    pub fn enter_after_hours(&mut self) -> bool {
        self.reveal_pending = false;
        self.set_mode(DisplayMode::Blink, None);
        if self.state.after_hours {
            return false;
        }
        self.state.after_hours = true;
        self.indicator_on = false;
        true
    }

    /// Rules 2-5 for an open tick. Returns the UV reveal delay when rule 4 fires.
    pub fn update_mode(&mut self, acquisition: &Acquisition, sun_above: bool) -> Option<Duration> {
        self.state.after_hours = false;
        self.reveal_pending = false;

        if !acquisition.ok {
            self.set_mode(DisplayMode::Error, Some(acquisition.message.clone()));
            return None;
        }
        if !self.config.uv_enabled || !sun_above {
            self.set_mode(DisplayMode::HighLow, None);
            return None;
        }
        if self.config.show_high_low_first {
            self.set_mode(DisplayMode::HighLow, None);
            self.reveal_pending = true;
            return Some(Duration::from_secs(self.config.high_low_seconds.min(MAX_HIGH_LOW_SECONDS)));
        }
        self.set_mode(DisplayMode::Uv, None);
        None
    }

    /// The armed reveal fired. True if the panel switched to UV.
    pub fn reveal_uv(&mut self) -> bool {
        if !std::mem::take(&mut self.reveal_pending) || self.state.mode != DisplayMode::HighLow {
            return false;
        }
        self.set_mode(DisplayMode::Uv, None);
        true
    }

    /// One blink tick: the new indicator state, or None once hours have reopened.
    pub fn blink(&mut self) -> Option<bool> {
        if !self.state.after_hours {
            return None;
        }
        self.indicator_on = !self.indicator_on;
        Some(self.indicator_on)
    }

    fn set_mode(&mut self, mode: DisplayMode, error_message: Option<String>) {
        if mode != self.state.mode {
            log::info!("Display mode changed: {:?} -> {:?}", self.state.mode, mode);
        }
        if let Some(msg) = error_message.as_deref() {
            if self.state.error_message.as_deref() != Some(msg) {
                log::warn!("Showing error: {msg}");
            }
        }
        self.state.mode = mode;
        self.state.error_message = error_message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(uv_enabled: bool, show_high_low_first: bool) -> DisplayModeController {
        DisplayModeController::new(ModeControllerConfig {
            uv_enabled,
            show_high_low_first,
            ..ModeControllerConfig::default()
        })
    }

    #[test]
    fn test_uv_disabled_is_always_high_low() {
        let mut ctl = controller(false, true);
        for sun_above in [false, true, true, false] {
            assert_eq!(ctl.update_mode(&Acquisition::success(), sun_above), None);
            assert_eq!(ctl.current_mode(), DisplayMode::HighLow);
        }
        assert!(!ctl.reveal_uv());
    }

    #[test]
    fn test_sun_up_goes_straight_to_uv() {
        let mut ctl = controller(true, false);
        assert_eq!(ctl.update_mode(&Acquisition::success(), true), None);
        assert_eq!(ctl.current_mode(), DisplayMode::Uv);
    }

    #[test]
    fn test_sun_down_shows_high_low() {
        let mut ctl = controller(true, false);
        ctl.update_mode(&Acquisition::success(), false);
        assert_eq!(ctl.current_mode(), DisplayMode::HighLow);
    }

    #[test]
    fn test_high_low_first_then_reveal() {
        let mut ctl = controller(true, true);
        let delay = ctl.update_mode(&Acquisition::warning(), true);
        assert_eq!(delay, Some(Duration::from_secs(10)));
        assert_eq!(ctl.current_mode(), DisplayMode::HighLow);
        assert!(ctl.reveal_uv());
        assert_eq!(ctl.current_mode(), DisplayMode::Uv);
        // one shot
        assert!(!ctl.reveal_uv());
    }

    #[test]
    fn test_reveal_delay_is_capped() {
        let mut ctl = DisplayModeController::new(ModeControllerConfig {
            show_high_low_first: true,
            high_low_seconds: 90,
            ..ModeControllerConfig::default()
        });
        assert_eq!(ctl.update_mode(&Acquisition::success(), true), Some(Duration::from_secs(55)));
    }

    #[test]
    fn test_mode_change_cancels_pending_reveal() {
        let mut ctl = controller(true, true);
        ctl.update_mode(&Acquisition::success(), true);
        ctl.update_mode(&Acquisition::failure("Network HTTP error: 500"), true);
        assert!(!ctl.reveal_uv());
        assert_eq!(ctl.current_mode(), DisplayMode::Error);
        assert_eq!(ctl.state().error_message.as_deref(), Some("Network HTTP error: 500"));
    }

    #[test]
    fn test_error_clears_on_recovery() {
        let mut ctl = controller(false, false);
        ctl.update_mode(&Acquisition::failure("bad"), false);
        ctl.update_mode(&Acquisition::success(), false);
        assert_eq!(ctl.state().error_message, None);
        assert_eq!(ctl.current_mode(), DisplayMode::HighLow);
    }

    #[test]
    fn test_after_hours_blink_lifecycle() {
        let mut ctl = controller(true, false);
        assert_eq!(ctl.blink(), None);

        assert!(ctl.enter_after_hours());
        assert!(!ctl.enter_after_hours());
        assert_eq!(ctl.current_mode(), DisplayMode::Blink);
        assert_eq!(ctl.blink(), Some(true));
        assert_eq!(ctl.blink(), Some(false));
        assert_eq!(ctl.blink(), Some(true));

        ctl.update_mode(&Acquisition::success(), false);
        assert!(!ctl.state().after_hours);
        assert_eq!(ctl.blink(), None);

        // closing again starts a fresh blink
        assert!(ctl.enter_after_hours());
        assert_eq!(ctl.blink(), Some(true));
    }

    #[test]
    fn test_operating_window() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        let ctl = DisplayModeController::new(ModeControllerConfig {
            hours: OpenHours::Window { open: t(7, 0), close: t(22, 30) },
            ..ModeControllerConfig::default()
        });
        assert!(!ctl.is_open(t(6, 59)));
        assert!(ctl.is_open(t(7, 0)));
        assert!(!ctl.is_open(t(22, 30)));
    }
}
