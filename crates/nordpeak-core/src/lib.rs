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

//! NordPeak core: Nord Pool price retrieval, CSV persistence, peak selection
//! and discharge orchestration.
//!
//! Vendor specifics live behind [`DischargeController`]; price retrieval
//! behind [`PriceSource`]. Both are async traits so the binaries can wire real
//! implementations while tests use in-memory doubles.

pub mod clock;
pub mod discharge;
pub mod error;
pub mod monitor;
pub mod peak;
pub mod pricing;
pub mod retention;
pub mod storage;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use discharge::{DISCHARGE_SPAN, DischargeMode, DischargeOutcome, DischargeRunner};
pub use error::{PricingError, StorageError};
pub use monitor::{FetchMonitor, MonitorOutcome, RetryWindow, fetch_and_store};
pub use peak::find_peak;
pub use pricing::NordPoolClient;
pub use retention::prune_dated_files;
pub use storage::PriceStore;
pub use traits::{DischargeController, PriceSource};

pub use nordpeak_types as types;
