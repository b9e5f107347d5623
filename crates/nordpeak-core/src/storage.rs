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

//! CSV persistence of day prices in the saves folder.
//!
//! One file per delivery date: `<area>_prices_<YYYY-MM-DD>.csv`.

use crate::error::{StorageError, StorageResult};
use crate::retention::prune_dated_files;
use chrono::NaiveDate;
use nordpeak_types::{DayPrices, PriceSlot};
use std::path::{Path, PathBuf};
use tracing::info;

const CSV_EXTENSION: &str = "csv";

#[derive(Debug, Clone)]
pub struct PriceStore {
    folder: PathBuf,
    prefix: String,
    area: String,
}

impl PriceStore {
    pub fn new(folder: impl Into<PathBuf>, area: impl Into<String>) -> Self {
        let area = area.into();
        Self {
            folder: folder.into(),
            prefix: format!("{}_prices", area.to_lowercase()),
            area,
        }
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.folder
            .join(format!("{}_{}.{CSV_EXTENSION}", self.prefix, date.format("%Y-%m-%d")))
    }

    #[must_use]
    pub fn exists(&self, date: NaiveDate) -> bool {
        self.path_for(date).is_file()
    }

    pub fn ensure_folder(&self) -> StorageResult<()> {
        std::fs::create_dir_all(&self.folder).map_err(|e| StorageError::io(&self.folder, e))
    }

    /// Write the day's slots, replacing an existing file for that date
    pub fn save(&self, prices: &DayPrices) -> StorageResult<PathBuf> {
        self.ensure_folder()?;
        let path = self.path_for(prices.date);

        let mut writer = csv::Writer::from_path(&path).map_err(|e| StorageError::csv(&path, e))?;
        for slot in &prices.slots {
            writer
                .serialize(slot)
                .map_err(|e| StorageError::csv(&path, e))?;
        }
        writer.flush().map_err(|e| StorageError::io(&path, e))?;

        info!("Saved: {}", path.display());
        Ok(path)
    }

    pub fn load(&self, date: NaiveDate) -> StorageResult<DayPrices> {
        let path = self.path_for(date);
        let mut reader = csv::Reader::from_path(&path).map_err(|e| StorageError::csv(&path, e))?;

        let slots = reader
            .deserialize::<PriceSlot>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::csv(&path, e))?;

        Ok(DayPrices::new(date, self.area.clone(), slots))
    }

    /// Pick the file the discharge should act on.
    ///
    /// Tomorrow's prices win; today's are the fallback for manual runs.
    pub fn select_for_discharge(
        &self,
        today: NaiveDate,
        tomorrow: NaiveDate,
    ) -> StorageResult<Option<DayPrices>> {
        if !self.folder.is_dir() {
            info!("No saves folder—run fetcher first!");
            return Ok(None);
        }

        if self.exists(tomorrow) {
            return self.load(tomorrow).map(Some);
        }

        info!(
            "No data for tomorrow ({})—falling back to today",
            self.file_name(tomorrow)
        );

        if self.exists(today) {
            return self.load(today).map(Some);
        }

        info!("No today's data either—run fetcher with --test-today first");
        Ok(None)
    }

    /// Keep only the newest `keep` price files
    pub fn prune(&self, keep: usize) -> StorageResult<Vec<PathBuf>> {
        prune_dated_files(&self.folder, &self.prefix, CSV_EXTENSION, keep)
    }

    fn file_name(&self, date: NaiveDate) -> String {
        self.path_for(date)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
