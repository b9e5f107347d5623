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

//! Polling for the next day's auction results inside a daily retry window

use crate::clock::Clock;
use crate::storage::PriceStore;
use crate::traits::PriceSource;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use nordpeak_types::FetcherConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Local-time window in which fetch attempts are made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub retry_minutes: u32,
}

impl RetryWindow {
    #[must_use]
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            start_hour: config.retry_start_hour,
            end_hour: config.retry_end_hour,
            retry_minutes: config.retry_minutes.max(1),
        }
    }

    /// Minute of day from which no more attempts are made (`end_hour:retry_minutes`)
    #[must_use]
    pub fn cutoff_minute(&self) -> u32 {
        (self.end_hour * 60 + self.retry_minutes).min(MINUTES_PER_DAY - 1)
    }

    #[must_use]
    pub fn cutoff_label(&self) -> String {
        let cutoff = self.cutoff_minute();
        format!("{:02}:{:02}", cutoff / 60, cutoff % 60)
    }

    /// Absolute instant of the cutoff on the local day `date`.
    /// A cutoff inside a DST gap moves to the first valid minute after it.
    #[must_use]
    pub fn deadline(&self, date: NaiveDate, tz: Tz) -> DateTime<Utc> {
        let cutoff = self.cutoff_minute();
        let mut local = date.and_time(NaiveTime::MIN) + TimeDelta::minutes(i64::from(cutoff));
        for _ in 0..=60 {
            if let Some(resolved) = tz.from_local_datetime(&local).earliest() {
                return resolved.with_timezone(&Utc);
            }
            local += TimeDelta::minutes(1);
        }
        tz.from_utc_datetime(&local).with_timezone(&Utc)
    }

    /// Time left until the window opens, `None` once it is open
    #[must_use]
    pub fn delay_until_open(&self, local: NaiveTime) -> Option<Duration> {
        let now = local.num_seconds_from_midnight();
        let open = self.start_hour * 3600;
        (now < open).then(|| Duration::from_secs(u64::from(open - now)))
    }

    /// Time until the next wall-clock boundary that is a multiple of
    /// `retry_minutes` (30 gives :00 and :30)
    #[must_use]
    pub fn delay_until_next_attempt(&self, local: NaiveTime) -> Duration {
        let now = local.num_seconds_from_midnight();
        let interval = self.retry_minutes * 60;
        let next = (now / interval + 1) * interval;
        Duration::from_secs(u64::from(next - now))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Prices were fetched and written to `path`
    Fetched { path: PathBuf, attempts: u32 },
    /// The window closed before prices were published
    GaveUp { attempts: u32 },
}

/// Fetch `date` once and persist it, pruning old price files.
///
/// Returns the saved path, or `None` when prices are not available.
/// Fetch errors are logged and reported as `None`; storage errors propagate.
pub async fn fetch_and_store(
    source: &dyn PriceSource,
    store: &PriceStore,
    date: NaiveDate,
    keep_files: usize,
) -> Result<Option<PathBuf>> {
    let prices = match source.fetch_day(date).await {
        Ok(Some(prices)) => prices,
        Ok(None) => return Ok(None),
        Err(e) => {
            warn!("Exception fetching {date} from {}: {e:#}", source.name());
            return Ok(None);
        }
    };

    let path = store.save(&prices)?;
    store.prune(keep_files)?;
    Ok(Some(path))
}

pub struct FetchMonitor<'a> {
    source: &'a dyn PriceSource,
    store: &'a PriceStore,
    clock: &'a dyn Clock,
    tz: Tz,
    window: RetryWindow,
    keep_files: usize,
}

impl std::fmt::Debug for FetchMonitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchMonitor")
            .field("source", &self.source.name())
            .field("tz", &self.tz)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl<'a> FetchMonitor<'a> {
    pub fn new(
        source: &'a dyn PriceSource,
        store: &'a PriceStore,
        clock: &'a dyn Clock,
        tz: Tz,
        window: RetryWindow,
        keep_files: usize,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            tz,
            window,
            keep_files,
        }
    }

    fn local_time(&self) -> NaiveTime {
        self.clock.now().with_timezone(&self.tz).time()
    }

    /// Sleep for `wait`, but never beyond `deadline`
    async fn sleep_until_at_most(&self, wait: Duration, deadline: DateTime<Utc>) {
        let left = (deadline - self.clock.now()).to_std().unwrap_or_default();
        self.clock.sleep(wait.min(left)).await;
    }

    /// Poll until `date` is published or the window closes.
    ///
    /// The window belongs to the local day the monitor was started on;
    /// attempts never continue past that day's cutoff.
    pub async fn run(&self, date: NaiveDate) -> Result<MonitorOutcome> {
        info!("Starting monitoring for tomorrow's data ({date})");
        let today = self.clock.now().with_timezone(&self.tz).date_naive();
        let deadline = self.window.deadline(today, self.tz);
        let mut attempts = 0;

        loop {
            let local = self.local_time();
            if self.clock.now() >= deadline {
                info!(
                    "Reached {} {} — stopping tomorrow fetch attempts",
                    self.window.cutoff_label(),
                    self.tz.name()
                );
                return Ok(MonitorOutcome::GaveUp { attempts });
            }

            if let Some(wait) = self.window.delay_until_open(local) {
                info!(
                    "Retry window opens at {:02}:00 → waiting {} min",
                    self.window.start_hour,
                    wait.as_secs().div_ceil(60)
                );
                self.sleep_until_at_most(wait, deadline).await;
                continue;
            }

            attempts += 1;
            if let Some(path) =
                fetch_and_store(self.source, self.store, date, self.keep_files).await?
            {
                info!("Tomorrow's data ({date}) fetched and saved!");
                return Ok(MonitorOutcome::Fetched { path, attempts });
            }

            let wait = self.window.delay_until_next_attempt(self.local_time());
            info!(
                "Tomorrow's data not ready → retry in {} min",
                wait.as_secs().div_ceil(60)
            );
            self.sleep_until_at_most(wait, deadline).await;
        }
    }
}
