/*
 *  acquire.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Acquisition engine: one fetch per main tick, error tolerance and
 *  the live reading plus the day's high/low
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

use chrono::{DateTime, Datelike, Local};
use log::{debug, error, warn};

use crate::highlow::{HighLowRecord, HighLowStore};
use crate::weather::{FetchError, Observation, Reading, WeatherSource};

/// Transient failures tolerated in a row before the error screen shows.
pub const ERROR_THRESHOLD: u32 = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionState {
    pub consecutive_error_count: u32,
    pub lifetime_error_count: u32,
}

/// Outcome of one acquisition as seen by the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    pub ok: bool,
    pub message: String,
}

impl Acquisition {
    pub fn success() -> Self {
        Self { ok: true, message: "Success".into() }
    }

    /// A failure still inside the tolerance window.
    pub fn warning() -> Self {
        Self { ok: true, message: "Warning".into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, message: message.into() }
    }
}

pub struct Acquirer<S: WeatherSource> {
    source: S,
    store: HighLowStore,
    state: AcquisitionState,
    live: Reading,
}

impl<S: WeatherSource> Acquirer<S> {
    pub fn new(source: S, store: HighLowStore) -> Self {
        Self {
            source,
            store,
            state: AcquisitionState::default(),
            live: Reading::default(),
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn reading(&self) -> &Reading {
        &self.live
    }

    pub fn high_low(&self) -> &HighLowRecord {
        self.store.record()
    }

    pub fn source_maintains_high_low(&self) -> bool {
        self.source.maintains_high_low()
    }

    /// Count an error raised outside the fetch path.
    pub fn record_unexpected_error(&mut self) {
        self.state.lifetime_error_count += 1;
    }

    /// Fetch once and fold the result into the live state.
    pub async fn acquire(&mut self, now: DateTime<Local>) -> Acquisition {
        match self.source.fetch().await {
            Ok(obs) => {
                self.state.consecutive_error_count = 0;
                self.apply(obs, now);
                debug!(
                    "Reading: temp {:?} uv {:?} at {:?}",
                    self.live.temperature, self.live.uv_index, self.live.sampled_at
                );
                Acquisition::success()
            }
            Err(err) => self.on_failure(err, now),
        }
    }

    fn on_failure(&mut self, err: FetchError, now: DateTime<Local>) -> Acquisition {
        self.state.consecutive_error_count += 1;
        self.state.lifetime_error_count += 1;
        let AcquisitionState { consecutive_error_count, lifetime_error_count } = self.state;

        if err.is_permanent() {
            error!(
                "Consecutive error count: {consecutive_error_count}.  Total error count: {lifetime_error_count}. {err}"
            );
            return Acquisition::failure(err.display_message());
        }
        warn!(
            "Consecutive error count: {consecutive_error_count}.  Total error count: {lifetime_error_count}. {err}"
        );

        if consecutive_error_count > ERROR_THRESHOLD {
            return Acquisition::failure(err.display_message());
        }
        if let FetchError::Outdated { observation, .. } = err {
            // still the freshest data upstream has
            self.apply(*observation, now);
        }
        Acquisition::warning()
    }

    fn apply(&mut self, obs: Observation, now: DateTime<Local>) {
        let today = now.ordinal();
        let persisted = match obs.day_high_low {
            Some((high, low)) => self.store.replace(today, high, low),
            None => self.store.update(today, obs.reading.temperature),
        };
        if let Err(e) = persisted {
            warn!("Could not save {}: {}", self.store.path().display(), e);
            self.state.lifetime_error_count += 1;
        }
        self.live = obs.reading;
    }
}
