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

//! Discharge orchestration: pick the peak slot from saved prices and program
//! the battery for it.
//!
//! All work runs inside the [`DISCHARGE_SPAN`] span so the logging setup can
//! route it to the dedicated discharge log.

use crate::peak::find_peak;
use crate::retention::prune_dated_files;
use crate::storage::PriceStore;
use crate::traits::DischargeController;
use anyhow::Result;
use chrono::NaiveDate;
use nordpeak_types::{DischargeConfig, PeakSlot};
use tracing::{error, info, warn};

/// Name of the span wrapping discharge runs
pub const DISCHARGE_SPAN: &str = "discharge";

const LOG_EXTENSION: &str = "txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DischargeMode {
    Live,
    /// Log what would be programmed without touching the inverter
    DryRun,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DischargeOutcome {
    /// No price file or no slot above the threshold
    Skipped,
    DryRun(PeakSlot),
    Scheduled(PeakSlot),
    Failed { peak: PeakSlot, error: String },
}

impl DischargeOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

pub struct DischargeRunner<'a> {
    store: &'a PriceStore,
    controller: &'a dyn DischargeController,
    config: &'a DischargeConfig,
    log_prefix: Option<String>,
    keep_files: usize,
}

impl std::fmt::Debug for DischargeRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DischargeRunner")
            .field("controller", &self.controller.name())
            .field("config", self.config)
            .field("log_prefix", &self.log_prefix)
            .finish_non_exhaustive()
    }
}

impl<'a> DischargeRunner<'a> {
    pub fn new(
        store: &'a PriceStore,
        controller: &'a dyn DischargeController,
        config: &'a DischargeConfig,
    ) -> Self {
        Self {
            store,
            controller,
            config,
            log_prefix: None,
            keep_files: usize::MAX,
        }
    }

    /// Prune `<prefix>_<date>.txt` logs in the saves folder before and after each run
    #[must_use]
    pub fn with_log_retention(mut self, prefix: impl Into<String>, keep_files: usize) -> Self {
        self.log_prefix = Some(prefix.into());
        self.keep_files = keep_files;
        self
    }

    fn prune_logs(&self) {
        let Some(prefix) = &self.log_prefix else {
            return;
        };
        if let Err(e) = prune_dated_files(self.store.folder(), prefix, LOG_EXTENSION, self.keep_files)
        {
            warn!("Failed to prune discharge logs: {e}");
        }
    }

    #[tracing::instrument(name = "discharge", skip_all)]
    pub async fn run(
        &self,
        today: NaiveDate,
        tomorrow: NaiveDate,
        mode: DischargeMode,
    ) -> Result<DischargeOutcome> {
        info!("Solar discharge optimizer started");
        self.prune_logs();

        let peak = self
            .store
            .select_for_discharge(today, tomorrow)?
            .and_then(|prices| find_peak(&prices, self.config.min_price_threshold));

        let Some(peak) = peak else {
            info!("No viable peak—skipping discharge");
            return Ok(DischargeOutcome::Skipped);
        };

        let start = peak.start.format("%H:%M");
        if mode == DischargeMode::DryRun {
            info!(
                "TEST MODE: Would discharge on {} at {start} for €{:.2}/MWh",
                peak.date, peak.price
            );
            return Ok(DischargeOutcome::DryRun(peak));
        }

        let duration = self.config.discharge_duration_min;
        let outcome = match self.controller.schedule_discharge(peak.start, duration).await {
            Ok(()) => {
                info!(
                    "Discharge scheduled: {start} for {duration} min via {}",
                    self.controller.name()
                );
                info!(
                    "LIVE: Discharged at {start}—est. gain €{:.2} (at {}kW)",
                    peak.estimated_gain(duration, self.config.assumed_power_kw),
                    self.config.assumed_power_kw
                );
                DischargeOutcome::Scheduled(peak)
            }
            Err(e) => {
                error!("Discharge failed—check wiring/config: {e:#}");
                DischargeOutcome::Failed {
                    peak,
                    error: format!("{e:#}"),
                }
            }
        };

        self.prune_logs();
        Ok(outcome)
    }

    /// Read the status register and report the result
    #[tracing::instrument(name = "discharge", skip_all)]
    pub async fn check_connection(&self) -> Result<u16> {
        match self.controller.read_status().await {
            Ok(value) => {
                info!(
                    "Connection SUCCESS via {}: status register = {value}",
                    self.controller.name()
                );
                Ok(value)
            }
            Err(e) => {
                error!("Connection test FAILED: {e:#}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use nordpeak_types::{DayPrices, PriceSlot};
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingController {
        calls: Mutex<Vec<(NaiveTime, u16)>>,
        fail: bool,
    }

    #[async_trait]
    impl DischargeController for RecordingController {
        async fn schedule_discharge(&self, start: NaiveTime, duration_min: u16) -> Result<()> {
            self.calls.lock().push((start, duration_min));
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }

        async fn read_status(&self) -> Result<u16> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(7)
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn dates() -> (NaiveDate, NaiveDate) {
        let today = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        (today, today.succ_opt().unwrap())
    }

    fn save_day(store: &PriceStore, date: NaiveDate, slots: Vec<PriceSlot>) {
        store.save(&DayPrices::new(date, "LV", slots)).unwrap();
    }

    #[tokio::test]
    async fn test_live_run_programs_peak() {
        let temp = TempDir::new().unwrap();
        let store = PriceStore::new(temp.path(), "LV");
        let (today, tomorrow) = dates();
        save_day(
            &store,
            tomorrow,
            vec![
                PriceSlot::new(hm(8, 0), hm(8, 15), 95.0),
                PriceSlot::new(hm(18, 45), hm(19, 0), 210.4),
            ],
        );

        let controller = RecordingController::default();
        let config = DischargeConfig::default();
        let runner = DischargeRunner::new(&store, &controller, &config);

        let outcome = runner.run(today, tomorrow, DischargeMode::Live).await.unwrap();

        let DischargeOutcome::Scheduled(peak) = outcome else {
            panic!("expected scheduled outcome, got {outcome:?}");
        };
        assert_eq!(peak.date, tomorrow);
        assert_eq!(peak.start, hm(18, 45));
        assert_eq!(*controller.calls.lock(), vec![(hm(18, 45), 15)]);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_inverter_alone() {
        let temp = TempDir::new().unwrap();
        let store = PriceStore::new(temp.path(), "LV");
        let (today, tomorrow) = dates();
        save_day(&store, today, vec![PriceSlot::new(hm(9, 0), hm(9, 15), 50.0)]);

        let controller = RecordingController::default();
        let config = DischargeConfig::default();
        let runner = DischargeRunner::new(&store, &controller, &config);

        let outcome = runner.run(today, tomorrow, DischargeMode::DryRun).await.unwrap();

        assert!(matches!(outcome, DischargeOutcome::DryRun(p) if p.date == today));
        assert!(controller.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_skips_below_threshold() {
        let temp = TempDir::new().unwrap();
        let store = PriceStore::new(temp.path(), "LV");
        let (today, tomorrow) = dates();
        save_day(&store, tomorrow, vec![PriceSlot::new(hm(3, 0), hm(3, 15), 4.2)]);

        let controller = RecordingController::default();
        let config = DischargeConfig::default();
        let runner = DischargeRunner::new(&store, &controller, &config);

        let outcome = runner.run(today, tomorrow, DischargeMode::Live).await.unwrap();
        assert_eq!(outcome, DischargeOutcome::Skipped);
        assert!(controller.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_skips_without_price_files() {
        let temp = TempDir::new().unwrap();
        let store = PriceStore::new(temp.path(), "LV");
        let (today, tomorrow) = dates();

        let controller = RecordingController::default();
        let config = DischargeConfig::default();
        let runner = DischargeRunner::new(&store, &controller, &config);

        let outcome = runner.run(today, tomorrow, DischargeMode::Live).await.unwrap();
        assert_eq!(outcome, DischargeOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_controller_failure_reported() {
        let temp = TempDir::new().unwrap();
        let store = PriceStore::new(temp.path(), "LV");
        let (today, tomorrow) = dates();
        save_day(&store, tomorrow, vec![PriceSlot::new(hm(18, 0), hm(18, 15), 150.0)]);

        let controller = RecordingController {
            fail: true,
            ..Default::default()
        };
        let config = DischargeConfig::default();
        let runner = DischargeRunner::new(&store, &controller, &config);

        let outcome = runner.run(today, tomorrow, DischargeMode::Live).await.unwrap();
        assert!(outcome.is_failure());
        if let DischargeOutcome::Failed { error, .. } = outcome {
            assert!(error.contains("connection refused"));
        }
    }

    #[tokio::test]
    async fn test_run_prunes_discharge_logs() {
        let temp = TempDir::new().unwrap();
        let store = PriceStore::new(temp.path(), "LV");
        for day in 1..=4 {
            std::fs::write(temp.path().join(format!("discharge_log_2025-11-0{day}.txt")), b"").unwrap();
        }
        let (today, tomorrow) = dates();

        let controller = RecordingController::default();
        let config = DischargeConfig::default();
        let runner =
            DischargeRunner::new(&store, &controller, &config).with_log_retention("discharge_log", 2);

        runner.run(today, tomorrow, DischargeMode::Live).await.unwrap();

        assert!(!temp.path().join("discharge_log_2025-11-01.txt").exists());
        assert!(!temp.path().join("discharge_log_2025-11-02.txt").exists());
        assert!(temp.path().join("discharge_log_2025-11-04.txt").exists());
    }

    #[tokio::test]
    async fn test_check_connection() {
        let temp = TempDir::new().unwrap();
        let store = PriceStore::new(temp.path(), "LV");
        let config = DischargeConfig::default();

        let ok = RecordingController::default();
        assert_eq!(
            DischargeRunner::new(&store, &ok, &config)
                .check_connection()
                .await
                .unwrap(),
            7
        );

        let broken = RecordingController {
            fail: true,
            ..Default::default()
        };
        assert!(
            DischargeRunner::new(&store, &broken, &config)
                .check_connection()
                .await
                .is_err()
        );
    }
}
