/*
 *  config.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  YAML configuration, CLI overrides and startup validation
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

use chrono::NaiveTime;
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

/// Longest hold of the high/low panel before the UV reveal; the main loop repeats every 60s.
pub const MAX_HIGH_LOW_SECONDS: u64 = 55;

/// Largest accepted panel width or height, in pixels.
pub const MAX_PANEL_DIMENSION: u32 = 1024;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// e.g. "info" | "debug"
    #[serde(default)]
    pub log_level: Option<String>,
    /// Where today's high/low survives restarts
    #[serde(default = "default_high_low_file")]
    pub high_low_file: PathBuf,
    #[serde(default)]
    pub units: TempUnits,
    pub weather: WeatherConfig,
    pub operating_hours: OperatingHours,
    #[serde(default)]
    pub dimmer: DimmerConfig,
    #[serde(default)]
    pub uv: UvConfig,
    pub location: LocationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    /// Optional monitoring feed
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempUnits {
    #[default]
    Celsius,
    Fahrenheit,
}

/// Upstream credentials. Exactly one of `legacy` / `current` is allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub legacy: Option<LegacyCredentials>,
    #[serde(default)]
    pub current: Option<CurrentCredentials>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// WeatherLink IP device account (v1 API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyCredentials {
    pub user: String,
    pub password: String,
}

/// WeatherLink console account (v2 API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCredentials {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub station_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingHours {
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub on_time: Option<String>,
    #[serde(default)]
    pub off_time: Option<String>,
}

/// Resolved operating window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenHours {
    AllDay,
    Window { open: NaiveTime, close: NaiveTime },
}

impl OpenHours {
    /// A window whose close precedes its open spans midnight.
    pub fn is_open(&self, now: NaiveTime) -> bool {
        match *self {
            OpenHours::AllDay => true,
            OpenHours::Window { open, close } if open <= close => open <= now && now < close,
            OpenHours::Window { open, close } => now >= open || now < close,
        }
    }
}

impl OperatingHours {
    pub fn resolve(&self) -> Result<OpenHours, ConfigError> {
        if self.all_day {
            return Ok(OpenHours::AllDay);
        }
        let open = parse_hhmm("on_time", self.on_time.as_deref())?;
        let close = parse_hhmm("off_time", self.off_time.as_deref())?;
        Ok(OpenHours::Window { open, close })
    }
}

fn parse_hhmm(field: &str, value: Option<&str>) -> Result<NaiveTime, ConfigError> {
    let s = value.ok_or_else(|| {
        ConfigError::Validation(format!("operating_hours.{field} is required unless all_day is set"))
    })?;
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| {
        ConfigError::Validation(format!("operating_hours.{field} must be HH:MM, got '{s}'"))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimmerConfig {
    #[serde(default)]
    pub use_sensor: bool,
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: String,
    #[serde(default = "default_min_brightness")]
    pub min_brightness_percent: i32,
    #[serde(default = "default_max_brightness")]
    pub max_brightness_percent: i32,
}

impl Default for DimmerConfig {
    fn default() -> Self {
        Self {
            use_sensor: false,
            i2c_bus: default_i2c_bus(),
            min_brightness_percent: default_min_brightness(),
            max_brightness_percent: default_max_brightness(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UvConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Show the high/low panel for `high_low_seconds` before switching to UV
    #[serde(default)]
    pub show_high_low_first: bool,
    #[serde(default = "default_high_low_seconds")]
    pub high_low_seconds: u64,
}

impl Default for UvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_high_low_first: false,
            high_low_seconds: default_high_low_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees above (+) or below (-) the mathematical horizon
    #[serde(default = "default_horizon_deg")]
    pub horizon_deg: f64,
    /// Minutes trimmed from each end of the day before the sun counts as up (hills, trees)
    #[serde(default)]
    pub sun_offset_minutes: u32,
    /// Hottest temperature (C) that still changes colour
    #[serde(default = "default_really_hot")]
    pub really_hot: f64,
    #[serde(default = "default_really_cold")]
    pub really_cold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { width: default_width(), height: default_height() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub user: String,
    pub key: String,
    pub feed: String,
}

fn default_high_low_file() -> PathBuf { PathBuf::from("high-lows.data") }
fn default_timeout_secs() -> u64 { 20 }
fn default_i2c_bus() -> String { "/dev/i2c-1".to_string() }
fn default_min_brightness() -> i32 { 20 }
fn default_max_brightness() -> i32 { 100 }
fn default_true() -> bool { true }
fn default_high_low_seconds() -> u64 { 10 }
fn default_horizon_deg() -> f64 { -0.833 }
fn default_really_hot() -> f64 { 40.0 }
fn default_really_cold() -> f64 { -30.0 }
fn default_width() -> u32 { 128 }
fn default_height() -> u32 { 32 }

/// CLI overrides, layered over the YAML file.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "wxmatrix", about = "WxMatrix ambient temperature display", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Path of the persisted daily high/low record
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub high_low_file: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Everything `load` does apart from touching the process arguments.
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    let path = match cli.config.as_ref() {
        Some(p) if p.exists() => p.clone(),
        Some(p) => {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        None => find_config_file().ok_or_else(|| {
            ConfigError::Validation("no configuration file found (try --config)".into())
        })?,
    };

    let mut cfg = read_yaml(&path)?;
    apply_cli_overrides(&mut cfg, cli);
    validate(&mut cfg)?;
    Ok(cfg)
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let mut cfg: Config = serde_yaml::from_str(s)?;
        validate(&mut cfg)?;
        Ok(cfg)
    }
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/wxmatrix/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/wxmatrix/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/wxmatrix.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["wxmatrix.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if let Some(p) = cli.high_low_file.as_ref() { cfg.high_low_file = p.clone(); }
}

/// Invariants and clamps. Anything rejected here is fatal at startup.
fn validate(cfg: &mut Config) -> Result<(), ConfigError> {
    match (&cfg.weather.legacy, &cfg.weather.current) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::Validation(
                "configure exactly one of weather.legacy or weather.current, not both".into(),
            ));
        }
        (None, None) => {
            return Err(ConfigError::Validation(
                "credentials for weather.legacy or weather.current are required".into(),
            ));
        }
        (Some(l), None) if l.user.is_empty() => {
            return Err(ConfigError::Validation("weather.legacy.user must not be empty".into()));
        }
        (None, Some(c)) if c.api_key.is_empty() || c.api_secret.is_empty() => {
            return Err(ConfigError::Validation(
                "weather.current.api_key and api_secret must not be empty".into(),
            ));
        }
        _ => {}
    }
    if cfg.weather.timeout_secs == 0 {
        return Err(ConfigError::Validation("weather.timeout_secs must be > 0".into()));
    }

    cfg.operating_hours.resolve()?;

    let loc = &cfg.location;
    if !(-90.0..=90.0).contains(&loc.latitude) || !(-180.0..=180.0).contains(&loc.longitude) {
        return Err(ConfigError::Validation(format!(
            "location ({}, {}) is not a valid latitude/longitude",
            loc.latitude, loc.longitude
        )));
    }
    if !(loc.really_hot > 0.0 && loc.really_cold < 0.0) {
        return Err(ConfigError::Validation(
            "location.really_hot must be > 0 and location.really_cold < 0".into(),
        ));
    }

    let dimmer = &mut cfg.dimmer;
    dimmer.max_brightness_percent = dimmer.max_brightness_percent.min(100);
    dimmer.min_brightness_percent = dimmer.min_brightness_percent.max(0);
    if dimmer.min_brightness_percent > dimmer.max_brightness_percent {
        return Err(ConfigError::Validation(
            "dimmer.min_brightness_percent must not exceed max_brightness_percent".into(),
        ));
    }

    cfg.uv.high_low_seconds = cfg.uv.high_low_seconds.min(MAX_HIGH_LOW_SECONDS);

    let dims = 1..=MAX_PANEL_DIMENSION;
    if !dims.contains(&cfg.display.width) || !dims.contains(&cfg.display.height) {
        return Err(ConfigError::Validation(format!(
            "display width/height must be within 1..={MAX_PANEL_DIMENSION}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
weather:
  current:
    api_key: k
    api_secret: s
    station_name: Backyard
operating_hours:
  on_time: "07:00"
  off_time: "22:30"
location:
  latitude: 49.3
  longitude: -123.1
"#;

    #[test]
    fn test_defaults_fill_in() {
        let cfg = Config::from_yaml_str(BASE).unwrap();
        assert_eq!(cfg.units, TempUnits::Celsius);
        assert_eq!(cfg.weather.timeout_secs, 20);
        assert!(cfg.uv.enabled);
        assert!(!cfg.dimmer.use_sensor);
        assert_eq!(cfg.location.horizon_deg, -0.833);
        assert_eq!(cfg.high_low_file, PathBuf::from("high-lows.data"));
        assert!(cfg.telemetry.is_none());
    }

    #[test]
    fn test_both_protocols_rejected() {
        let yaml = BASE.replace(
            "weather:\n",
            "weather:\n  legacy:\n    user: u\n    password: p\n",
        );
        assert!(matches!(Config::from_yaml_str(&yaml), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_bad_time_is_fatal() {
        let yaml = BASE.replace("\"22:30\"", "\"10pm\"");
        assert!(matches!(Config::from_yaml_str(&yaml), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unparsable_document() {
        assert!(matches!(Config::from_yaml_str("weather: [oops"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_clamps() {
        let yaml = format!(
            "{BASE}dimmer:\n  max_brightness_percent: 180\n  min_brightness_percent: -5\nuv:\n  high_low_seconds: 90\n"
        );
        let cfg = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(cfg.dimmer.max_brightness_percent, 100);
        assert_eq!(cfg.dimmer.min_brightness_percent, 0);
        assert_eq!(cfg.uv.high_low_seconds, MAX_HIGH_LOW_SECONDS);
    }

    #[test]
    fn test_panel_size_bounds() {
        let yaml = format!("{BASE}display:\n  width: 70000\n  height: 70000\n");
        assert!(matches!(Config::from_yaml_str(&yaml), Err(ConfigError::Validation(_))));
        let yaml = format!("{BASE}display:\n  width: 64\n  height: 0\n");
        assert!(matches!(Config::from_yaml_str(&yaml), Err(ConfigError::Validation(_))));
        let yaml = format!("{BASE}display:\n  width: 64\n  height: 64\n");
        assert_eq!(Config::from_yaml_str(&yaml).unwrap().display.width, 64);
    }

    #[test]
    fn test_open_hours() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        let day = OpenHours::Window { open: t(7, 0), close: t(22, 30) };
        assert!(day.is_open(t(7, 0)));
        assert!(day.is_open(t(22, 29)));
        assert!(!day.is_open(t(22, 30)));
        assert!(!day.is_open(t(3, 0)));

        let night = OpenHours::Window { open: t(20, 0), close: t(6, 0) };
        assert!(night.is_open(t(23, 0)));
        assert!(night.is_open(t(5, 59)));
        assert!(!night.is_open(t(12, 0)));

        assert!(OpenHours::AllDay.is_open(t(3, 0)));
    }

    #[test]
    fn test_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wx.yaml");
        fs::write(&path, BASE).unwrap();
        let cli = Cli {
            config: Some(path),
            log_level: Some("debug".into()),
            high_low_file: Some(PathBuf::from("/tmp/hl.data")),
            dump_config: false,
        };
        let cfg = load_with(&cli).unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.high_low_file, PathBuf::from("/tmp/hl.data"));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let cli = Cli { config: Some(PathBuf::from("/nonexistent/wx.yaml")), ..Default::default() };
        assert!(matches!(load_with(&cli), Err(ConfigError::Validation(_))));
    }
}
