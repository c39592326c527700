/*
 *  scheduler.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  The single event loop: main tick, blink tick, UV reveal and telemetry
 *  completions, all serialized onto the station.
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

use chrono::Local;
use log::{debug, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::station::Station;
use crate::sun::Ephemeris;
use crate::telemetry::{TelemetryClient, TelemetryError};
use crate::weather::WeatherSource;

pub const MAIN_PERIOD: Duration = Duration::from_secs(60);
pub const BLINK_PERIOD: Duration = Duration::from_secs(1);

/// Completions posted back from spawned work.
#[derive(Debug)]
pub enum Event {
    Telemetry(Result<(), TelemetryError>),
}

pub struct Scheduler<S: WeatherSource, E: Ephemeris> {
    station: Station<S, E>,
    telemetry: Option<TelemetryClient>,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    upload: Option<JoinHandle<()>>,
}

/// Pends forever when nothing is armed.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl<S: WeatherSource, E: Ephemeris> Scheduler<S, E> {
    pub fn new(station: Station<S, E>, telemetry: Option<TelemetryClient>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(8);
        Self { station, telemetry, events_tx, events_rx, upload: None }
    }

    /// Runs until `shutdown` changes, then blanks the panel and hands the
    /// station back.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Station<S, E> {
        let mut main_tick = time::interval(MAIN_PERIOD);
        main_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut blink_at: Option<Instant> = None;
        let mut reveal_at: Option<Instant> = None;

        if *shutdown.borrow() {
            self.station.shutdown();
            return self.station;
        }

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    info!("Shutdown requested");
                    break;
                }

                _ = main_tick.tick() => {
                    let now = Local::now();
                    let outcome = self.station.tick(now).await;
                    // anything armed by the previous tick is stale now
                    reveal_at = outcome.reveal_after.map(|d| Instant::now() + d);
                    if outcome.blink_started {
                        blink_at = Some(Instant::now() + BLINK_PERIOD);
                    }
                    if let Some(line) = self.station.telemetry_line(now) {
                        self.spawn_upload(line);
                    }
                }

                _ = sleep_until_opt(blink_at) => {
                    blink_at = self.station.blink().then(|| Instant::now() + BLINK_PERIOD);
                }

                _ = sleep_until_opt(reveal_at) => {
                    reveal_at = None;
                    self.station.reveal_uv();
                }

                Some(event) = self.events_rx.recv() => match event {
                    Event::Telemetry(result) => self.station.on_telemetry_result(result),
                },
            }
        }

        if let Some(upload) = self.upload.take() {
            upload.abort();
        }
        self.station.shutdown();
        self.station
    }

    fn spawn_upload(&mut self, line: String) {
        let Some(client) = self.telemetry.clone() else {
            return;
        };
        if self.upload.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Previous telemetry upload still running, skipping");
            return;
        }
        let tx = self.events_tx.clone();
        self.upload = Some(tokio::spawn(async move {
            let result = client.send(&line).await;
            let _ = tx.send(Event::Telemetry(result)).await;
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::Acquirer;
    use crate::astral::SolarEstimator;
    use crate::brightness::BrightnessController;
    use crate::config::{DimmerConfig, OpenHours, TempUnits};
    use crate::display::{
        DisplayModeController, ModeControllerConfig, Panel, Presentation, RecordingRenderer, RenderCall,
    };
    use crate::highlow::{HighLowRecord, HighLowStore};
    use crate::location::Location;
    use crate::sun::{EphemerisError, SunTimes};
    use crate::weather::{FetchError, Observation, Reading};
    use chrono::{NaiveDate, NaiveTime};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Steady {
        fetches: Rc<Cell<u32>>,
        upstream_high_low: bool,
    }

    impl WeatherSource for Steady {
        fn maintains_high_low(&self) -> bool {
            self.upstream_high_low
        }

        async fn fetch(&self) -> Result<Observation, FetchError> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(Observation {
                reading: Reading { temperature: Some(18.0), uv_index: Some(4.0), sampled_at: None },
                day_high_low: None,
            })
        }
    }

    struct Midday;

    impl Ephemeris for Midday {
        fn sun_times(&self, _: f64, _: f64, _: f64, _: NaiveDate) -> Result<SunTimes, EphemerisError> {
            Err(EphemerisError::AlwaysUp)
        }
    }

    fn scheduler(
        modes: ModeControllerConfig,
        upstream_high_low: bool,
    ) -> (Scheduler<Steady, Midday>, RecordingRenderer, Rc<Cell<u32>>) {
        let fetches = Rc::new(Cell::new(0));
        let source = Steady { fetches: fetches.clone(), upstream_high_low };
        let store = HighLowStore::in_memory("/nonexistent/hl.data", HighLowRecord::empty(1));
        let location = Location { latitude: 51.5, longitude: 0.0, horizon_deg: -0.833, sun_offset_minutes: 0 };
        let renderer = RecordingRenderer::new();
        let presentation = Presentation { units: TempUnits::Celsius, really_hot: 30.0, really_cold: 0.0 };
        let station = Station::new(
            Acquirer::new(source, store),
            SolarEstimator::new(location, Midday),
            BrightnessController::new(None, &DimmerConfig::default()),
            DisplayModeController::new(modes),
            Box::new(renderer.clone()),
            presentation,
        );
        (Scheduler::new(station, None), renderer, fetches)
    }

    fn never_open() -> OpenHours {
        let t = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        OpenHours::Window { open: t, close: t }
    }

    async fn run_for(sched: Scheduler<Steady, Midday>, span: Duration) -> Station<Steady, Midday> {
        let (tx, rx) = watch::channel(false);
        let stop = async move {
            time::sleep(span).await;
            let _ = tx.send(true);
        };
        let (station, ()) = tokio::join!(sched.run(rx), stop);
        station
    }

    #[tokio::test(start_paused = true)]
    async fn test_main_tick_every_minute() {
        let cfg = ModeControllerConfig { uv_enabled: false, ..ModeControllerConfig::default() };
        let (sched, renderer, fetches) = scheduler(cfg, false);
        let station = run_for(sched, Duration::from_secs(125)).await;

        assert_eq!(fetches.get(), 3);
        assert_eq!(station.acquisition_state().consecutive_error_count, 0);
        let calls = renderer.calls();
        let shown = calls.iter().filter(|c| matches!(c, RenderCall::Readings(_))).count();
        assert_eq!(shown, 3);
        assert_eq!(calls.last(), Some(&RenderCall::Clear));
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_low_then_uv_reveal() {
        let cfg = ModeControllerConfig { show_high_low_first: true, high_low_seconds: 10, ..Default::default() };
        let (sched, renderer, _) = scheduler(cfg, false);
        run_for(sched, Duration::from_secs(15)).await;

        let panels: Vec<Panel> = renderer
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RenderCall::Readings(frame) => Some(frame.panel),
                _ => None,
            })
            .collect();
        assert_eq!(panels, vec![Panel::HighLow, Panel::Uv]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_hours_blinks_every_second() {
        let cfg = ModeControllerConfig { hours: never_open(), ..Default::default() };
        let (sched, renderer, fetches) = scheduler(cfg, true);
        run_for(sched, Duration::from_millis(3500)).await;

        // a station that keeps its own high/low is not polled after hours
        assert_eq!(fetches.get(), 0);
        let indicator: Vec<bool> = renderer
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RenderCall::Indicator(on) => Some(on),
                _ => None,
            })
            .collect();
        assert_eq!(indicator, vec![true, false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_hours_still_polls_current_protocol() {
        let cfg = ModeControllerConfig { hours: never_open(), ..Default::default() };
        let (sched, _, fetches) = scheduler(cfg, false);
        run_for(sched, Duration::from_secs(61)).await;
        assert_eq!(fetches.get(), 2);
    }
}
