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

//! Error types for the core crate

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Nord Pool API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid Nord Pool response: {0}")]
    InvalidResponse(String),

    #[error("invalid fetcher configuration: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
pub type PricingResult<T> = std::result::Result<T, PricingError>;
