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

//! Application wiring shared by both binaries

use crate::config::{self, LoadedConfig};
use crate::logging;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use nordpeak_core::{
    Clock, DischargeController, DischargeMode, DischargeOutcome, DischargeRunner, FetchMonitor,
    MonitorOutcome, PriceSource, PriceStore, RetryWindow, fetch_and_store, prune_dated_files,
};
use nordpeak_types::AppConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const LOG_EXTENSION: &str = "txt";

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Stop after today's fetch and discharge
    pub test_today: bool,
    pub dry_run: bool,
}

/// What a fetcher run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    pub today_file: Option<PathBuf>,
    pub discharge: Option<DischargeOutcome>,
    pub tomorrow: Option<MonitorOutcome>,
}

impl FetchReport {
    /// A live discharge was attempted and failed
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.discharge
            .as_ref()
            .is_some_and(DischargeOutcome::is_failure)
    }
}

#[derive(Debug)]
pub struct App {
    config: AppConfig,
    tz: Tz,
    store: PriceStore,
}

/// Load config, install logging and log a configuration summary
pub fn start(config_path: Option<&Path>) -> Result<App> {
    let loaded = config::load_config(config_path)?;
    let tz = loaded.timezone()?;
    logging::init(
        Path::new(&loaded.config.storage.saves_folder),
        &loaded.config.logging,
        tz,
    )?;
    log_summary(&loaded);
    App::new(loaded.config)
}

fn log_summary(loaded: &LoadedConfig) {
    let config = &loaded.config;
    info!("Configuration loaded from {}", loaded.source);
    info!(
        "   Area: {} ({}), timezone {}",
        config.fetcher.delivery_area, config.fetcher.currency, config.fetcher.timezone
    );
    info!(
        "   Retry window: {}:00-{}:{:02} every {} min",
        config.fetcher.retry_start_hour,
        config.fetcher.retry_end_hour,
        config.fetcher.retry_minutes,
        config.fetcher.retry_minutes
    );
    info!(
        "   Discharge: >= €{}/MWh for {} min",
        config.discharge.min_price_threshold, config.discharge.discharge_duration_min
    );
    info!(
        "   Inverter: {} unit {}",
        config.inverter.transport, config.inverter.unit_id
    );
    for warning in &loaded.validation.warnings {
        warn!("Config warning: {warning}");
    }
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let tz = config::parse_timezone(&config.fetcher.timezone)?;
        let store = PriceStore::new(&config.storage.saves_folder, &config.fetcher.delivery_area);
        Ok(Self { config, tz, store })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    fn today(&self, clock: &dyn Clock) -> NaiveDate {
        clock.now().with_timezone(&self.tz).date_naive()
    }

    fn runner<'a>(&'a self, controller: &'a dyn DischargeController) -> DischargeRunner<'a> {
        DischargeRunner::new(&self.store, controller, &self.config.discharge).with_log_retention(
            self.config.logging.discharge_log_prefix.as_str(),
            self.config.storage.max_files,
        )
    }

    fn prune_fetch_logs(&self) {
        if let Err(e) = prune_dated_files(
            self.store.folder(),
            &self.config.logging.fetch_log_prefix,
            LOG_EXTENSION,
            self.config.storage.max_files,
        ) {
            warn!("Failed to prune fetch logs: {e}");
        }
    }

    /// Daily fetcher: today's prices and discharge, then monitor tomorrow
    pub async fn run_fetcher(
        &self,
        source: &dyn PriceSource,
        controller: &dyn DischargeController,
        clock: &dyn Clock,
        options: FetchOptions,
    ) -> Result<FetchReport> {
        info!("=== Solar Nord Pool Automation Started ===");
        self.store
            .ensure_folder()
            .context("Failed to create saves folder")?;
        self.prune_fetch_logs();

        let mut report = FetchReport::default();
        let today = self.today(clock);
        let tomorrow = today.succ_opt().context("Date out of range")?;
        let keep = self.config.storage.max_files;
        let mode = if options.dry_run {
            DischargeMode::DryRun
        } else {
            DischargeMode::Live
        };

        info!("Running discharge for TODAY ({today})");
        report.today_file = fetch_and_store(source, &self.store, today, keep).await?;
        if report.today_file.is_some() {
            info!("Today's data ready → running discharge");
            let outcome = self.runner(controller).run(today, tomorrow, mode).await?;
            report.discharge = Some(outcome);
        } else {
            warn!("Failed to fetch today's data");
        }

        if options.test_today {
            return Ok(report);
        }

        let monitor = FetchMonitor::new(
            source,
            &self.store,
            clock,
            self.tz,
            RetryWindow::from_config(&self.config.fetcher),
            keep,
        );
        report.tomorrow = Some(monitor.run(tomorrow).await?);

        info!("All tasks completed — exiting. Restart daily.");
        Ok(report)
    }

    /// Standalone discharge against the saved price files
    pub async fn run_discharge(
        &self,
        controller: &dyn DischargeController,
        clock: &dyn Clock,
        mode: DischargeMode,
    ) -> Result<DischargeOutcome> {
        let today = self.today(clock);
        let tomorrow = today.succ_opt().context("Date out of range")?;
        self.runner(controller).run(today, tomorrow, mode).await
    }

    pub async fn check_connection(&self, controller: &dyn DischargeController) -> Result<u16> {
        self.runner(controller).check_connection().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveTime, TimeZone, Utc};
    use mockito::{Matcher, Server};
    use nordpeak_core::{ManualClock, NordPoolClient};
    use nordpeak_types::{DayPrices, PriceSlot};
    use parking_lot::Mutex;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingController {
        calls: Mutex<Vec<(NaiveTime, u16)>>,
    }

    #[async_trait]
    impl DischargeController for RecordingController {
        async fn schedule_discharge(&self, start: NaiveTime, duration_min: u16) -> Result<()> {
            self.calls.lock().push((start, duration_min));
            Ok(())
        }

        async fn read_status(&self) -> Result<u16> {
            Ok(1)
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn config_for(temp: &TempDir, api_base_url: String) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.saves_folder = temp.path().join("saves").to_string_lossy().into_owned();
        config.fetcher.api_base_url = api_base_url;
        config
    }

    // Two quarter-hours on 2025-12-01, 17:00Z is 19:00 in Riga
    fn short_body() -> String {
        json!({
            "multiAreaEntries": [
                {
                    "deliveryStart": "2025-12-01T16:45:00Z",
                    "deliveryEnd": "2025-12-01T17:00:00Z",
                    "entryPerArea": { "LV": 80.0 }
                },
                {
                    "deliveryStart": "2025-12-01T17:00:00Z",
                    "deliveryEnd": "2025-12-01T17:15:00Z",
                    "entryPerArea": { "LV": 199.999 }
                }
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_today_run_fetches_and_discharges() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/DayAheadPrices")
            .match_query(Matcher::UrlEncoded("date".into(), "2025-12-01".into()))
            .with_status(200)
            .with_body(short_body())
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let app = App::new(config_for(&temp, server.url())).unwrap();
        let client = NordPoolClient::new(&app.config().fetcher).unwrap();
        let controller = RecordingController::default();
        // 10:00 in Riga
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap());

        let report = app
            .run_fetcher(
                &client,
                &controller,
                &clock,
                FetchOptions {
                    test_today: true,
                    dry_run: false,
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
        let today = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(report.today_file, Some(app.store().path_for(today)));
        assert!(matches!(report.discharge, Some(DischargeOutcome::Scheduled(_))));
        assert!(report.tomorrow.is_none());
        assert!(!report.is_failure());
        assert_eq!(
            *controller.calls.lock(),
            vec![(NaiveTime::from_hms_opt(19, 0, 0).unwrap(), 15)]
        );
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_full_run_gives_up_after_cutoff() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/DayAheadPrices")
            .match_query(Matcher::Any)
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let app = App::new(config_for(&temp, server.url())).unwrap();
        let client = NordPoolClient::new(&app.config().fetcher).unwrap();
        let controller = RecordingController::default();
        // 19:00 in Riga, past the 18:30 cutoff
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 12, 1, 17, 0, 0).unwrap());

        let report = app
            .run_fetcher(&client, &controller, &clock, FetchOptions::default())
            .await
            .unwrap();

        // Only today's request; the monitor never polls
        mock.assert_async().await;
        assert!(report.today_file.is_none());
        assert!(report.discharge.is_none());
        assert_eq!(report.tomorrow, Some(MonitorOutcome::GaveUp { attempts: 0 }));
        assert!(controller.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_discharge_uses_tomorrow_file() {
        let temp = TempDir::new().unwrap();
        let app = App::new(config_for(&temp, "http://127.0.0.1:9".into())).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2025, 12, 2).unwrap();
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        app.store()
            .save(&DayPrices::new(
                tomorrow,
                "LV",
                vec![
                    PriceSlot::new(hm(7, 0), hm(7, 15), 120.0),
                    PriceSlot::new(hm(8, 0), hm(8, 15), 121.5),
                ],
            ))
            .unwrap();

        let controller = RecordingController::default();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 12, 1, 20, 0, 0).unwrap());
        let outcome = app
            .run_discharge(&controller, &clock, DischargeMode::DryRun)
            .await
            .unwrap();

        let DischargeOutcome::DryRun(peak) = outcome else {
            panic!("expected dry run, got {outcome:?}");
        };
        assert_eq!(peak.date, tomorrow);
        assert_eq!(peak.start, hm(8, 0));
        assert!(controller.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_logs_pruned_on_start() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/DayAheadPrices")
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let mut config = config_for(&temp, server.url());
        config.storage.max_files = 1;
        let app = App::new(config).unwrap();
        std::fs::create_dir_all(app.store().folder()).unwrap();
        for day in ["2025-11-28", "2025-11-29", "2025-11-30"] {
            std::fs::write(app.store().folder().join(format!("fetch_log_{day}.txt")), b"").unwrap();
        }

        let client = NordPoolClient::new(&app.config().fetcher).unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap());
        app.run_fetcher(
            &client,
            &RecordingController::default(),
            &clock,
            FetchOptions {
                test_today: true,
                dry_run: true,
            },
        )
        .await
        .unwrap();

        let folder = app.store().folder();
        assert!(!folder.join("fetch_log_2025-11-28.txt").exists());
        assert!(!folder.join("fetch_log_2025-11-29.txt").exists());
        assert!(folder.join("fetch_log_2025-11-30.txt").exists());
    }

    #[test]
    fn test_report_failure_flag() {
        let report = FetchReport {
            discharge: Some(DischargeOutcome::Skipped),
            ..Default::default()
        };
        assert!(!report.is_failure());
    }
}
