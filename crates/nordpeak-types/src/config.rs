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

use serde::{Deserialize, Serialize};

/// Top-level configuration, one section per concern.
///
/// Every section has defaults so a partial `nordpeak.toml` is valid; the
/// defaults describe a Latvian (LV zone) farm with a SolaX EMS1000 on Modbus TCP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetcher: FetcherConfig,
    pub storage: StorageConfig,
    pub discharge: DischargeConfig,
    pub inverter: InverterConfig,
    pub logging: LoggingConfig,
}

/// Nord Pool fetcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Nord Pool delivery area code (e.g. "LV", "EE", "LT")
    pub delivery_area: String,

    /// Price currency requested from the data portal
    pub currency: String,

    /// IANA timezone used for slot times, log timestamps and file dates
    pub timezone: String,

    /// Data portal base URL (overridable for testing)
    pub api_base_url: String,

    pub request_timeout_secs: u64,

    /// Local hour at which tomorrow's prices are first requested
    pub retry_start_hour: u32,

    /// Local hour after which retries stop (together with `retry_minutes`)
    pub retry_end_hour: u32,

    /// Retry cadence; attempts are aligned to multiples of this within the hour
    pub retry_minutes: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            delivery_area: "LV".to_owned(),
            currency: "EUR".to_owned(),
            timezone: "Europe/Riga".to_owned(),
            api_base_url: "https://dataportal-api.nordpoolgroup.com".to_owned(),
            request_timeout_secs: 10,
            retry_start_hour: 13,
            retry_end_hour: 18,
            retry_minutes: 30,
        }
    }
}

impl FetcherConfig {
    /// File prefix for saved price CSVs, e.g. `lv_prices`
    #[must_use]
    pub fn price_file_prefix(&self) -> String {
        format!("{}_prices", self.delivery_area.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Folder holding price CSVs and dated logs
    pub saves_folder: String,

    /// Number of newest files kept per kind (CSVs, fetch logs, discharge logs)
    pub max_files: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            saves_folder: "saves".to_owned(),
            max_files: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DischargeConfig {
    /// Minimum price (per MWh) a slot needs to be considered for discharge
    pub min_price_threshold: f64,

    /// Discharge length programmed into the inverter
    pub discharge_duration_min: u16,

    /// Discharge power used for the gain estimate in logs
    pub assumed_power_kw: f64,
}

impl Default for DischargeConfig {
    fn default() -> Self {
        Self {
            min_price_threshold: 20.0,
            discharge_duration_min: 15,
            assumed_power_kw: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModbusTransportKind {
    /// Modbus TCP over Ethernet
    #[default]
    Tcp,
    /// Modbus RTU over an RS485 serial adapter
    Rtu,
}

impl std::fmt::Display for ModbusTransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Rtu => write!(f, "rtu"),
        }
    }
}

/// Modbus connection to the SolaX EMS1000
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverterConfig {
    pub transport: ModbusTransportKind,

    /// Inverter IP address (tcp)
    pub host: String,

    /// Modbus TCP port (tcp)
    pub port: u16,

    /// Serial device path (rtu)
    pub serial_device: String,

    /// Serial line speed (rtu)
    pub baud_rate: u32,

    /// Modbus slave address
    pub unit_id: u8,

    /// Per-request timeout
    pub timeout_ms: u64,

    pub registers: SolaxRegisters,
}

impl Default for InverterConfig {
    fn default() -> Self {
        Self {
            transport: ModbusTransportKind::Tcp,
            host: "192.168.1.100".to_owned(),
            port: 502,
            serial_device: "/dev/ttyUSB0".to_owned(),
            baud_rate: 9600,
            unit_id: 1,
            timeout_ms: 3000,
            registers: SolaxRegisters::default(),
        }
    }
}

/// Holding register addresses used to program a timed discharge.
///
/// Defaults match the EMS1000 timed-discharge block; firmware revisions
/// differ, so every address can be overridden in `[inverter.registers]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolaxRegisters {
    pub start_hour: u16,
    pub start_minute: u16,
    pub duration_minutes: u16,
    pub work_mode: u16,
    /// Value written to `work_mode` to arm timed discharge
    pub timed_discharge_mode: u16,
    /// Register read by the connection check
    pub status_register: u16,
}

impl Default for SolaxRegisters {
    fn default() -> Self {
        Self {
            start_hour: 0x011A,
            start_minute: 0x011B,
            duration_minutes: 0x011C,
            work_mode: 0x0100,
            timed_discharge_mode: 35,
            status_register: 0x0000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
    pub fetch_log_prefix: String,
    pub discharge_log_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            fetch_log_prefix: "fetch_log".to_owned(),
            discharge_log_prefix: "discharge_log".to_owned(),
        }
    }
}
