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

//! Shared data types for NordPeak: day-ahead price slots, peak selection
//! results and the on-disk configuration model.

pub mod config;
pub mod pricing;

pub use config::{
    AppConfig, DischargeConfig, FetcherConfig, InverterConfig, LoggingConfig,
    ModbusTransportKind, SolaxRegisters, StorageConfig,
};
pub use pricing::{DayPrices, PeakSlot, PriceSlot, round_price};
