// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of NordPeak.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

mod validation;

pub use validation::{ValidationIssue, ValidationResult, ValidationSeverity};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use nordpeak_types::{AppConfig, ModbusTransportKind};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "NORDPEAK_CONFIG";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "nordpeak.toml";

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file; defaults with `NORDPEAK_*` overrides
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Environment => write!(f, "defaults with environment overrides"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: ConfigSource,
    pub validation: ValidationResult,
}

impl LoadedConfig {
    /// Parsed timezone; validation guarantees it exists
    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.config.fetcher.timezone)
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("Unknown timezone '{name}': {e}"))
}

/// Load configuration from the process environment.
///
/// Order: explicit `path`, then `$NORDPEAK_CONFIG`, then `./nordpeak.toml`,
/// then defaults with environment overrides. An explicitly named file that
/// cannot be read is an error.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with(path, |key| std::env::var(key).ok())
}

pub fn load_config_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LoadedConfig> {
    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_ENV).map(PathBuf::from));

    let (config, source) = if let Some(path) = explicit {
        (read_file(&path)?, ConfigSource::File(path))
    } else if Path::new(DEFAULT_CONFIG_FILE).is_file() {
        let path = PathBuf::from(DEFAULT_CONFIG_FILE);
        (read_file(&path)?, ConfigSource::File(path))
    } else {
        (from_env(&env), ConfigSource::Environment)
    };

    let validation = validate_detailed(&config);
    if !validation.is_valid() {
        let problems: Vec<String> = validation.errors.iter().map(ToString::to_string).collect();
        anyhow::bail!(
            "Invalid configuration ({source}):\n  {}",
            problems.join("\n  ")
        );
    }

    Ok(LoadedConfig {
        config,
        source,
        validation,
    })
}

fn read_file(path: &Path) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Defaults with `NORDPEAK_*` overrides
fn from_env(env: &impl Fn(&str) -> Option<String>) -> AppConfig {
    let mut config = AppConfig::default();

    if let Some(area) = env("NORDPEAK_DELIVERY_AREA") {
        config.fetcher.delivery_area = area;
    }
    if let Some(folder) = env("NORDPEAK_SAVES_FOLDER") {
        config.storage.saves_folder = folder;
    }
    if let Some(host) = env("NORDPEAK_MODBUS_HOST") {
        config.inverter.host = host;
    }
    if let Some(level) = env("NORDPEAK_LOG_LEVEL") {
        config.logging.level = level;
    }

    config
}

/// Check every section and collect all problems
#[must_use]
pub fn validate_detailed(config: &AppConfig) -> ValidationResult {
    let mut result = ValidationResult::success();

    let fetcher = &config.fetcher;
    if fetcher.delivery_area.trim().is_empty() {
        result.add_error("fetcher.delivery_area", "Delivery area cannot be empty");
    }
    if fetcher.currency.trim().is_empty() {
        result.add_error("fetcher.currency", "Currency cannot be empty");
    }
    if parse_timezone(&fetcher.timezone).is_err() {
        result.add_error(
            "fetcher.timezone",
            format!("Unknown timezone '{}'", fetcher.timezone),
        );
    }
    if fetcher.request_timeout_secs == 0 {
        result.add_error("fetcher.request_timeout_secs", "Timeout must be at least 1s");
    }
    if fetcher.retry_start_hour > 23 {
        result.add_error("fetcher.retry_start_hour", "Hour must be 0-23");
    }
    if fetcher.retry_end_hour > 23 {
        result.add_error("fetcher.retry_end_hour", "Hour must be 0-23");
    }
    if fetcher.retry_start_hour >= fetcher.retry_end_hour {
        result.add_error(
            "fetcher.retry_end_hour",
            format!(
                "Retry window must end after it starts ({}:00 to {}:00)",
                fetcher.retry_start_hour, fetcher.retry_end_hour
            ),
        );
    }
    if fetcher.retry_minutes == 0 || 60 % fetcher.retry_minutes != 0 {
        result.add_error(
            "fetcher.retry_minutes",
            format!("{} does not divide an hour evenly", fetcher.retry_minutes),
        );
    } else if fetcher.retry_end_hour <= 23
        && fetcher.retry_end_hour * 60 + fetcher.retry_minutes >= 24 * 60
    {
        result.add_error(
            "fetcher.retry_minutes",
            format!(
                "Cutoff {}:00 + {} min would fall on the next day",
                fetcher.retry_end_hour, fetcher.retry_minutes
            ),
        );
    }
    if fetcher.retry_start_hour < 12 && fetcher.retry_start_hour < fetcher.retry_end_hour {
        result.add_warning(
            "fetcher.retry_start_hour",
            "Nord Pool publishes day-ahead results around 13:00 CET; earlier polls will miss",
        );
    }

    if config.storage.saves_folder.trim().is_empty() {
        result.add_error("storage.saves_folder", "Saves folder cannot be empty");
    }
    if config.storage.max_files == 0 {
        result.add_error("storage.max_files", "Must keep at least one file");
    }

    let discharge = &config.discharge;
    if !(1..=1440).contains(&discharge.discharge_duration_min) {
        result.add_error(
            "discharge.discharge_duration_min",
            "Duration must be between 1 and 1440 minutes",
        );
    }
    if !discharge.min_price_threshold.is_finite() {
        result.add_error("discharge.min_price_threshold", "Threshold must be a number");
    } else if discharge.min_price_threshold < 0.0 {
        result.add_warning(
            "discharge.min_price_threshold",
            "Negative threshold allows discharging into negative prices",
        );
    }
    if !(discharge.assumed_power_kw.is_finite() && discharge.assumed_power_kw > 0.0) {
        result.add_error("discharge.assumed_power_kw", "Power must be positive");
    }

    let inverter = &config.inverter;
    match inverter.transport {
        ModbusTransportKind::Tcp => {
            if inverter.host.trim().is_empty() {
                result.add_error("inverter.host", "Modbus host cannot be empty");
            }
            if inverter.port == 0 {
                result.add_error("inverter.port", "Port cannot be 0");
            }
        }
        ModbusTransportKind::Rtu => {
            if inverter.serial_device.trim().is_empty() {
                result.add_error("inverter.serial_device", "Serial device cannot be empty");
            }
            if inverter.baud_rate == 0 {
                result.add_error("inverter.baud_rate", "Baud rate cannot be 0");
            }
        }
    }
    if inverter.unit_id == 0 || inverter.unit_id > 247 {
        result.add_error("inverter.unit_id", "Unit id must be 1-247");
    }
    if inverter.timeout_ms == 0 {
        result.add_error("inverter.timeout_ms", "Timeout must be positive");
    }

    if config.logging.fetch_log_prefix == config.logging.discharge_log_prefix {
        result.add_error(
            "logging.discharge_log_prefix",
            "Fetch and discharge logs need different prefixes",
        );
    }
    if config.logging.fetch_log_prefix == config.fetcher.price_file_prefix()
        || config.logging.discharge_log_prefix == config.fetcher.price_file_prefix()
    {
        result.add_error(
            "logging",
            "Log prefixes must differ from the price file prefix",
        );
    }

    result
}
