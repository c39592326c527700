/*
 *  telemetry.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Best-effort status line to an Adafruit IO feed. A missing feed value for
 *  an hour is the alert, so failures here only get logged.
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

use log::debug;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::TelemetryConfig;
use crate::weather::build_client;

const AIO_BASE: &str = "https://io.adafruit.com/api/v2";

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Connection refused, DNS, timeout
    #[error("telemetry network error: {0}")]
    Network(String),
    /// The service answered but refused the value (bad key, throttled)
    #[error("telemetry rejected with HTTP {0}")]
    Rejected(u16),
    #[error("telemetry failed unexpectedly: {0}")]
    Unexpected(String),
}

impl TelemetryError {
    /// Network trouble and refusals are routine; anything else is a bug worth counting.
    pub fn is_expected(&self) -> bool {
        !matches!(self, TelemetryError::Unexpected(_))
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            TelemetryError::Network(err.to_string())
        } else if let Some(status) = err.status() {
            TelemetryError::Rejected(status.as_u16())
        } else {
            TelemetryError::Unexpected(err.to_string())
        }
    }
}

#[derive(Serialize)]
struct DataPoint<'a> {
    value: &'a str,
}

#[derive(Debug, Clone)]
pub struct TelemetryClient {
    client: Client,
    url: String,
    key: String,
}

impl TelemetryClient {
    pub fn new(cfg: &TelemetryConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(Duration::from_secs(15))?,
            url: format!("{AIO_BASE}/{}/feeds/{}/data", cfg.user, cfg.feed),
            key: cfg.key.clone(),
        })
    }

    pub fn feed_url(&self) -> &str {
        &self.url
    }

    pub async fn send(&self, line: &str) -> Result<(), TelemetryError> {
        let resp = self
            .client
            .post(&self.url)
            .header("X-AIO-Key", &self.key)
            .json(&DataPoint { value: line })
            .send()
            .await?;
        check_status(resp.status())?;
        debug!("Telemetry sent: {line}");
        Ok(())
    }
}

fn check_status(status: StatusCode) -> Result<(), TelemetryError> {
    if status.is_success() {
        Ok(())
    } else if status.is_client_error() || status.is_server_error() {
        Err(TelemetryError::Rejected(status.as_u16()))
    } else {
        Err(TelemetryError::Unexpected(format!("HTTP {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_url() {
        let cfg = TelemetryConfig { user: "stu".into(), key: "aio_x".into(), feed: "wx-cpu".into() };
        let client = TelemetryClient::new(&cfg).unwrap();
        assert_eq!(client.feed_url(), "https://io.adafruit.com/api/v2/stu/feeds/wx-cpu/data");
    }

    #[test]
    fn test_status_classes() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(check_status(StatusCode::CREATED).is_ok());
        assert!(matches!(check_status(StatusCode::UNAUTHORIZED), Err(TelemetryError::Rejected(401))));
        assert!(matches!(check_status(StatusCode::TOO_MANY_REQUESTS), Err(TelemetryError::Rejected(429))));
        let odd = check_status(StatusCode::MULTIPLE_CHOICES).unwrap_err();
        assert!(!odd.is_expected());
        assert!(TelemetryError::Network("refused".into()).is_expected());
    }
}
