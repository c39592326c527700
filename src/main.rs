/*
 *  main.rs
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

use anyhow::Context;
use chrono::{Datelike, Local};
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;

use wxmatrix::acquire::Acquirer;
use wxmatrix::astral::SolarEstimator;
use wxmatrix::brightness::BrightnessController;
use wxmatrix::config;
use wxmatrix::display::{CanvasRenderer, DisplayModeController, ModeControllerConfig, Presentation};
use wxmatrix::highlow::HighLowStore;
use wxmatrix::location::Location;
use wxmatrix::scheduler::Scheduler;
use wxmatrix::sensor::{LightSensor, open_veml7700};
use wxmatrix::station::Station;
use wxmatrix::sun::NoaaEphemeris;
use wxmatrix::telemetry::TelemetryClient;
use wxmatrix::weather::WeatherLink;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP.
async fn signal_handler() -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("loading configuration")?;

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".into());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let source = WeatherLink::from_config(&cfg.weather).context("weather source")?;

    let location = Location::from(&cfg.location);
    info!("Location {location}");
    let solar = SolarEstimator::new(location, NoaaEphemeris);

    let sensor: Option<Box<dyn LightSensor>> = if cfg.dimmer.use_sensor {
        match open_veml7700(&cfg.dimmer.i2c_bus) {
            Ok(s) => Some(Box::new(s)),
            Err(e) => {
                warn!("{e}; dimming from sun position instead");
                None
            }
        }
    } else {
        None
    };
    let brightness = BrightnessController::new(sensor, &cfg.dimmer);

    let store = HighLowStore::load(&cfg.high_low_file, Local::now().ordinal());
    let renderer = CanvasRenderer::new(cfg.display.width, cfg.display.height)
        .context("display canvas")?;
    let modes = DisplayModeController::new(ModeControllerConfig::from_config(&cfg)?);

    let telemetry = match cfg.telemetry.as_ref().map(TelemetryClient::new).transpose() {
        Ok(t) => t,
        Err(e) => {
            warn!("Telemetry disabled: {e}");
            None
        }
    };
    if let Some(t) = telemetry.as_ref() {
        info!("Telemetry to {}", t.feed_url());
    }

    let station = Station::new(
        Acquirer::new(source, store),
        solar,
        brightness,
        modes,
        Box::new(renderer),
        Presentation::new(cfg.units, &cfg.location),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(station, telemetry).run(shutdown_rx);
    tokio::pin!(scheduler);

    tokio::select! {
        result = signal_handler() => {
            if let Err(e) = result {
                error!("Signal handler failed: {e}");
            }
            let _ = shutdown_tx.send(true);
            scheduler.await;
        }
        _ = &mut scheduler => {
            warn!("Scheduler exited on its own");
        }
    }

    info!("Display cleared, exiting");
    Ok(())
}
