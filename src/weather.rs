/*
 *  weather.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  WeatherLink station adapters. Two upstream shapes are supported, one per
 *  deployment: the v1 NoaaExt document (legacy) and the v2 station/sensor
 *  API (current). Both normalise into an `Observation`.
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

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::{CurrentCredentials, LegacyCredentials, WeatherConfig};

const LEGACY_URL: &str = "https://api.weatherlink.com/v1/NoaaExt.json";
const STATIONS_URL: &str = "https://api.weatherlink.com/v2/stations";
const CURRENT_URL: &str = "https://api.weatherlink.com/v2/current";

/// The v1 feed refreshes every minute; anything past this is stuck upstream.
pub const LEGACY_MAX_AGE_SECS: i64 = 5 * 60;
/// Free v2 subscriptions refresh every 15 minutes.
pub const CURRENT_MAX_AGE_SECS: i64 = 16 * 60;

const BAD_LOGIN: &str = "Possible invalid Weatherlink user name or password";
const BAD_STATION: &str = "Possible invalid Weatherlink station name";
const BAD_API_KEY: &str = "Bad API key or secret?";

/// One normalised sample. Any field may be missing upstream.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reading {
    /// Degrees Celsius, one decimal
    pub temperature: Option<f64>,
    pub uv_index: Option<f64>,
    pub sampled_at: Option<DateTime<Local>>,
}

/// A reading plus the day's high/low when the upstream keeps them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Observation {
    pub reading: Reading,
    /// (high, low) in Celsius, legacy protocol only
    pub day_high_low: Option<(f64, f64)>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network connection error: {0}")]
    Connection(String),
    #[error("HTTP error: {0}")]
    Http(u16),
    #[error("invalid JSON: {0}")]
    Parse(String),
    #[error("missing key: {0}")]
    Field(String),
    #[error("outdated data, {age_minutes} minutes old")]
    Outdated {
        age_minutes: i64,
        observation: Box<Observation>,
    },
    #[error("{0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::Permanent(_))
    }

    /// Short text for the error screen.
    pub fn display_message(&self) -> String {
        match self {
            FetchError::Connection(_) => "Network connection error. Check WiFi. Will retry...".to_string(),
            FetchError::Http(code) => format!("Network HTTP error: {code}"),
            FetchError::Parse(e) => format!("JSON error: {e}"),
            FetchError::Field(key) => format!("JSON key error: {key}"),
            FetchError::Outdated { .. } => "Outdated data. Check local transmitter device".to_string(),
            FetchError::Permanent(reason) => reason.clone(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http(status.as_u16())
        } else {
            // connect, timeout, and anything else on the wire
            FetchError::Connection(err.to_string())
        }
    }
}

/// A configured upstream.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    /// True when the upstream keeps the day's high/low itself.
    fn maintains_high_low(&self) -> bool;

    async fn fetch(&self) -> Result<Observation, FetchError>;
}

/// Shared HTTP client setup.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

    let mut headers = header::HeaderMap::new();
    headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
    headers.insert("Accept", header::HeaderValue::from_static("application/json"));
    headers.insert("Connection", header::HeaderValue::from_static("close"));

    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

/// v1 API: one self-contained document with its own high/low.
#[derive(Debug, Clone)]
pub struct LegacyClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
}

impl LegacyClient {
    pub fn new(client: Client, creds: &LegacyCredentials) -> Self {
        Self {
            client,
            base_url: LEGACY_URL.to_string(),
            user: creds.user.clone(),
            password: creds.password.clone(),
        }
    }
}

impl WeatherSource for LegacyClient {
    fn maintains_high_low(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<Observation, FetchError> {
        debug!("Fetching v1 observation for {}", self.user);
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("user", self.user.as_str()), ("pass", self.password.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Http(status.as_u16()));
        }
        let body = resp.text().await?;
        parse_legacy(&body, Local::now())
    }
}

/// v2 API: resolve the station, then read its sensor array.
#[derive(Debug, Clone)]
pub struct CurrentClient {
    client: Client,
    api_key: String,
    api_secret: String,
    station_name: String,
}

impl CurrentClient {
    pub fn new(client: Client, creds: &CurrentCredentials) -> Self {
        Self {
            client,
            api_key: creds.api_key.clone(),
            api_secret: creds.api_secret.clone(),
            station_name: creds.station_name.clone(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .query(&[("api-key", self.api_key.as_str())])
            .header("X-Api-Secret", &self.api_secret)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Permanent(BAD_API_KEY.to_string()));
        }
        if status != StatusCode::OK {
            // e.g. 404 {"code":"404","message":"Unable to find weather station settings"}
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));
            warn!("WeatherLink HTTP {}: {}", status.as_u16(), detail.as_deref().unwrap_or("-"));
            return Err(FetchError::Http(status.as_u16()));
        }
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

impl WeatherSource for CurrentClient {
    fn maintains_high_low(&self) -> bool {
        false
    }

    async fn fetch(&self) -> Result<Observation, FetchError> {
        let stations = self.get_json(STATIONS_URL).await?;
        let station_id = select_station(&stations, &self.station_name)?;
        debug!("Using station id {station_id}");
        let current = self.get_json(&format!("{CURRENT_URL}/{station_id}")).await?;
        parse_current(&current, Local::now())
    }
}

/// The deployment's single configured upstream.
#[derive(Debug, Clone)]
pub enum WeatherLink {
    Legacy(LegacyClient),
    Current(CurrentClient),
}

impl WeatherLink {
    pub fn from_config(cfg: &WeatherConfig) -> Result<Self, FetchError> {
        let client = build_client(Duration::from_secs(cfg.timeout_secs))?;
        match (&cfg.legacy, &cfg.current) {
            (Some(legacy), _) => {
                info!("Using WeatherLink v1 interface");
                Ok(WeatherLink::Legacy(LegacyClient::new(client, legacy)))
            }
            (None, Some(current)) => {
                info!("Using WeatherLink v2 interface, station '{}'", current.station_name);
                Ok(WeatherLink::Current(CurrentClient::new(client, current)))
            }
            (None, None) => Err(FetchError::Permanent("No WeatherLink credentials configured".into())),
        }
    }
}

impl WeatherSource for WeatherLink {
    fn maintains_high_low(&self) -> bool {
        match self {
            WeatherLink::Legacy(c) => c.maintains_high_low(),
            WeatherLink::Current(c) => c.maintains_high_low(),
        }
    }

    async fn fetch(&self) -> Result<Observation, FetchError> {
        match self {
            WeatherLink::Legacy(c) => c.fetch().await,
            WeatherLink::Current(c) => c.fetch().await,
        }
    }
}

/// Numbers arrive as JSON numbers or as strings ("12.3", "--").
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Fahrenheit to Celsius, one decimal.
pub fn f_to_c(f: f64) -> f64 {
    ((f - 32.0) * 5.0 / 9.0 * 10.0).round() / 10.0
}

/// Parse a v1 NoaaExt body.
pub fn parse_legacy(body: &str, now: DateTime<Local>) -> Result<Observation, FetchError> {
    if body.trim() == "Invalid Request!" {
        return Err(FetchError::Permanent(BAD_LOGIN.to_string()));
    }
    let doc: Value = serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let current = doc
        .get("davis_current_observation")
        .ok_or_else(|| FetchError::Field("davis_current_observation".into()))?;
    let age = current
        .get("observation_age")
        .and_then(as_int)
        .ok_or_else(|| FetchError::Field("observation_age".into()))?;

    let temperature = doc.get("temp_c").and_then(as_number);
    let uv_index = current.get("uv_index").and_then(as_number);
    let high = current.get("temp_day_high_f").and_then(as_number).map(f_to_c);
    let low = current.get("temp_day_low_f").and_then(as_number).map(f_to_c);

    let observation = Observation {
        reading: Reading {
            temperature,
            uv_index,
            sampled_at: Some(now - ChronoDuration::seconds(age)),
        },
        day_high_low: high.zip(low),
    };

    if age > LEGACY_MAX_AGE_SECS {
        return Err(FetchError::Outdated { age_minutes: age / 60, observation: Box::new(observation) });
    }
    Ok(observation)
}

/// Pick the station id: the only station, or the one whose name matches.
pub fn select_station(doc: &Value, name: &str) -> Result<String, FetchError> {
    let stations = doc
        .get("stations")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Field("stations".into()))?;

    let station = if stations.len() == 1 {
        stations.first()
    } else {
        stations
            .iter()
            .find(|s| s.get("station_name").and_then(Value::as_str) == Some(name))
    };
    let station = station.ok_or_else(|| {
        warn!("Could not find station named '{name}'");
        FetchError::Permanent(BAD_STATION.to_string())
    })?;

    match station.get("station_id") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(FetchError::Field("station_id".into())),
    }
}

struct SensorKeys {
    temp: &'static str,
    uv: &'static str,
    ts: &'static str,
}

/// data_structure_type 23: Davis 6313 console
const CONSOLE_KEYS: SensorKeys = SensorKeys { temp: "temp", uv: "uv_index", ts: "ts" };
/// data_structure_type 2: WeatherLinkIP
const WLIP_KEYS: SensorKeys = SensorKeys { temp: "temp_out", uv: "uv", ts: "ts" };

/// Parse a v2 current-conditions body, fanning in across the station's sensors.
pub fn parse_current(doc: &Value, now: DateTime<Local>) -> Result<Observation, FetchError> {
    let sensors = doc
        .get("sensors")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Field("sensors".into()))?;

    let mut temp_f = None;
    let mut uv = None;
    let mut stamp = None;

    for sensor in sensors {
        let keys = match sensor.get("data_structure_type").and_then(as_int) {
            Some(23) => &CONSOLE_KEYS,
            Some(2) => &WLIP_KEYS,
            _ => continue,
        };
        let Some(data) = sensor.get("data").and_then(Value::as_array).and_then(|d| d.first()) else {
            continue;
        };
        let ts = data.get(keys.ts).and_then(as_int);

        if temp_f.is_none() {
            temp_f = data.get(keys.temp).and_then(as_number);
            if temp_f.is_some() && stamp.is_none() {
                stamp = ts;
            }
        }
        if uv.is_none() {
            uv = data.get(keys.uv).and_then(as_number);
            if uv.is_some() && stamp.is_none() {
                stamp = ts;
            }
        }
        if temp_f.is_some() && uv.is_some() {
            break;
        }
    }

    let sampled_at = stamp.and_then(|s| Local.timestamp_opt(s, 0).single());
    let observation = Observation {
        reading: Reading { temperature: temp_f.map(f_to_c), uv_index: uv, sampled_at },
        day_high_low: None,
    };

    if let Some(at) = sampled_at {
        let age = (now - at).num_seconds();
        if age > CURRENT_MAX_AGE_SECS {
            return Err(FetchError::Outdated { age_minutes: age / 60, observation: Box::new(observation) });
        }
    }
    Ok(observation)
}
