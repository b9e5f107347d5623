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

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use nordpeak_types::DayPrices;

/// Source of day-ahead prices.
/// Business logic uses this trait, never knows about the Nord Pool HTTP details
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch all slots for a delivery date.
    ///
    /// `Ok(None)` means the auction result is not published yet; callers
    /// treat that as "retry later", not as a failure.
    async fn fetch_day(&self, date: NaiveDate) -> Result<Option<DayPrices>>;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Battery system that can be programmed with a timed discharge
#[async_trait]
pub trait DischargeController: Send + Sync {
    /// Program a discharge starting at `start` (local time) for `duration_min` minutes
    async fn schedule_discharge(&self, start: NaiveTime, duration_min: u16) -> Result<()>;

    /// Read a single diagnostic register to prove the link works
    async fn read_status(&self) -> Result<u16>;

    /// Get controller name for logging
    fn name(&self) -> &str;
}
