/*
 *  station.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  All mutable application state in one place. The scheduler is the only
 *  caller, one event at a time.
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

use chrono::{DateTime, Local, Timelike};
use log::{debug, error};
use std::time::Duration;

use crate::acquire::{Acquirer, Acquisition, AcquisitionState};
use crate::astral::SolarEstimator;
use crate::brightness::{BrightnessController, BrightnessState};
use crate::display::{DisplayMode, DisplayModeController, DisplayState, Frame, Panel, Presentation, Renderer};
use crate::metrics::{MachineMetrics, status_line};
use crate::sun::Ephemeris;
use crate::telemetry::TelemetryError;
use crate::weather::WeatherSource;

/// Telemetry goes out on minutes divisible by this.
pub const TELEMETRY_EVERY_MINUTES: u32 = 10;

/// What a main tick asks the scheduler to arm.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Reveal UV after this long
    pub reveal_after: Option<Duration>,
    /// After hours just began; keep blinking every second
    pub blink_started: bool,
    /// None when the tick skipped the fetch
    pub acquisition: Option<Acquisition>,
}

pub struct Station<S: WeatherSource, E: Ephemeris> {
    acquirer: Acquirer<S>,
    solar: SolarEstimator<E>,
    brightness: BrightnessController,
    modes: DisplayModeController,
    renderer: Box<dyn Renderer>,
    presentation: Presentation,
}

impl<S: WeatherSource, E: Ephemeris> Station<S, E> {
    pub fn new(
        acquirer: Acquirer<S>,
        solar: SolarEstimator<E>,
        brightness: BrightnessController,
        modes: DisplayModeController,
        renderer: Box<dyn Renderer>,
        presentation: Presentation,
    ) -> Self {
        Self { acquirer, solar, brightness, modes, renderer, presentation }
    }

    pub fn display_state(&self) -> &DisplayState {
        self.modes.state()
    }

    pub fn acquisition_state(&self) -> AcquisitionState {
        self.acquirer.state()
    }

    pub fn brightness_state(&self) -> BrightnessState {
        self.brightness.state()
    }

    /// The 60 second tick: brightness, then mode, then render.
    pub async fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        let level = self.brightness.update(&self.solar, now);
        self.renderer.set_brightness(level.percent);

        if !self.modes.is_open(now.time()) {
            // nothing is shown, but a v2 station's high/low only exists if we keep reading it
            let acquisition = if self.acquirer.source_maintains_high_low() {
                None
            } else {
                Some(self.acquirer.acquire(now).await)
            };
            let blink_started = self.modes.enter_after_hours();
            if blink_started {
                self.renderer.clear();
                self.blink();
            }
            return TickOutcome { reveal_after: None, blink_started, acquisition };
        }

        let acquisition = self.acquirer.acquire(now).await;
        let sun_above = self.solar.is_sun_above(now);
        let reveal_after = self.modes.update_mode(&acquisition, sun_above);
        self.render();
        TickOutcome { reveal_after, blink_started: false, acquisition: Some(acquisition) }
    }

    /// One blink tick. False once hours have reopened; do not reschedule.
    pub fn blink(&mut self) -> bool {
        match self.modes.blink() {
            Some(on) => {
                self.renderer.set_indicator(on);
                true
            }
            None => false,
        }
    }

    /// The armed high/low hold ran out.
    pub fn reveal_uv(&mut self) {
        if self.modes.reveal_uv() {
            self.render();
        }
    }

    fn render(&mut self) {
        let panel = match self.modes.current_mode() {
            DisplayMode::HighLow => Panel::HighLow,
            DisplayMode::Uv => Panel::Uv,
            DisplayMode::Error => {
                let msg = self.modes.state().error_message.as_deref().unwrap_or_default();
                self.renderer.show_message(msg);
                return;
            }
            DisplayMode::Blink => return,
        };
        let frame = Frame::compose(
            self.acquirer.reading(),
            self.acquirer.high_low(),
            panel,
            &self.presentation,
        );
        self.renderer.show_readings(&frame);
    }

    /// The monitoring line when this minute is a reporting minute.
    pub fn telemetry_line(&self, now: DateTime<Local>) -> Option<String> {
        if now.minute() % TELEMETRY_EVERY_MINUTES != 0 {
            return None;
        }
        let level = self.brightness.state();
        Some(status_line(
            &MachineMetrics::read(),
            self.acquirer.state().lifetime_error_count,
            level.percent,
            level.last_light_value,
        ))
    }

    pub fn on_telemetry_result(&mut self, result: Result<(), TelemetryError>) {
        match result {
            Ok(()) => {}
            Err(e) if e.is_expected() => debug!("{e}"),
            Err(e) => {
                error!("{e}");
                self.acquirer.record_unexpected_error();
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.renderer.clear();
    }
}
