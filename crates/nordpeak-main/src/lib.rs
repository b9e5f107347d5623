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

//! NordPeak application layer: configuration, logging and the flows behind
//! the `nordpeak` and `nordpeak-discharge` binaries.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;

pub use app::{App, FetchOptions, FetchReport, start};
