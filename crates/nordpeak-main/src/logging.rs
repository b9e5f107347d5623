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

//! Tracing setup: stdout plus two dated log files in the saves folder.
//!
//! Events recorded inside the discharge span go to `<discharge_prefix>_<date>.txt`,
//! everything else to `<fetch_prefix>_<date>.txt`. Dates and timestamps use the
//! configured timezone so files roll over at local midnight.

use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use nordpeak_core::DISCHARGE_SPAN;
use nordpeak_types::LoggingConfig;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{Metadata, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::dynamic_filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, fmt};

/// Timestamps like `2025-12-01 19:00:03 EET`
#[derive(Debug, Clone, Copy)]
pub struct LocalTimer {
    tz: Tz,
}

impl LocalTimer {
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Utc::now().with_timezone(&self.tz);
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S %Z"))
    }
}

/// Appends to `<folder>/<prefix>_<local date>.txt`, reopening per event
#[derive(Debug, Clone)]
pub struct DailyFileWriter {
    folder: PathBuf,
    prefix: String,
    tz: Tz,
}

impl DailyFileWriter {
    pub fn new(folder: impl Into<PathBuf>, prefix: impl Into<String>, tz: Tz) -> Self {
        Self {
            folder: folder.into(),
            prefix: prefix.into(),
            tz,
        }
    }

    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.folder
            .join(format!("{}_{}.txt", self.prefix, date.format("%Y-%m-%d")))
    }

    /// File that receives events written at `now`; rolls over at local midnight
    fn path_at(&self, now: DateTime<Utc>) -> PathBuf {
        self.path_for(now.with_timezone(&self.tz).date_naive())
    }
}

/// Writer handed out per event; silently drops output when the file cannot be opened
#[derive(Debug)]
pub enum LogFile {
    Open(File),
    Unavailable,
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Open(file) => file.write(buf),
            Self::Unavailable => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Open(file) => file.flush(),
            Self::Unavailable => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for DailyFileWriter {
    type Writer = LogFile;

    fn make_writer(&'a self) -> Self::Writer {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_at(Utc::now()))
            .map_or(LogFile::Unavailable, LogFile::Open)
    }
}

fn in_discharge_scope<S>(cx: &Context<'_, S>) -> bool
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    cx.lookup_current()
        .is_some_and(|span| span.scope().any(|s| s.name() == DISCHARGE_SPAN))
}

// Spans are always enabled so the discharge span stays visible to both filters
fn is_span(meta: &Metadata<'_>) -> bool {
    meta.is_span()
}

/// Build the subscriber without installing it
pub fn build_subscriber(
    saves_folder: &Path,
    config: &LoggingConfig,
    tz: Tz,
    filter: EnvFilter,
) -> impl Subscriber + Send + Sync + use<> {
    let timer = LocalTimer::new(tz);
    let fetch_writer = DailyFileWriter::new(saves_folder, config.fetch_log_prefix.as_str(), tz);
    let discharge_writer =
        DailyFileWriter::new(saves_folder, config.discharge_log_prefix.as_str(), tz);

    let stdout = fmt::layer().with_timer(timer).with_target(false);

    let fetch_file = fmt::layer()
        .with_writer(fetch_writer)
        .with_ansi(false)
        .with_timer(timer)
        .with_target(false)
        .with_filter(dynamic_filter_fn(|meta, cx| {
            is_span(meta) || !in_discharge_scope(cx)
        }));

    let discharge_file = fmt::layer()
        .with_writer(discharge_writer)
        .with_ansi(false)
        .with_timer(timer)
        .with_target(false)
        .with_filter(dynamic_filter_fn(|meta, cx| {
            is_span(meta) || in_discharge_scope(cx)
        }));

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(fetch_file)
        .with(discharge_file)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(saves_folder: &Path, config: &LoggingConfig, tz: Tz) -> Result<()> {
    std::fs::create_dir_all(saves_folder)
        .with_context(|| format!("Failed to create saves folder {}", saves_folder.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    tracing::subscriber::set_global_default(build_subscriber(saves_folder, config, tz, filter))
        .context("Failed to install tracing subscriber")
}
