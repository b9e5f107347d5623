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

use clap::Parser;
use std::path::PathBuf;

/// Nord Pool day-ahead fetcher with peak discharge scheduling
#[derive(Debug, Parser)]
#[command(name = "nordpeak", version)]
#[command(
    long_about = "Fetch today's Nord Pool day-ahead prices, schedule a battery discharge for the\n\
    peak slot, then poll for tomorrow's prices until the retry window closes.\n\
    \nExamples:\n  \
    nordpeak                          # Daily run\n  \
    nordpeak --test-today             # Fetch today and discharge, skip tomorrow\n  \
    nordpeak --test-today --dry-run   # Same, without touching the inverter"
)]
pub struct FetchCli {
    /// Configuration file (default: $NORDPEAK_CONFIG or ./nordpeak.toml)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Fetch today's prices and run the discharge only
    #[arg(long)]
    pub test_today: bool,

    /// Log the discharge that would be programmed instead of writing to the inverter
    #[arg(long)]
    pub dry_run: bool,
}

/// Program a SolaX EMS1000 discharge for the peak slot of the saved prices
#[derive(Debug, Parser)]
#[command(name = "nordpeak-discharge", version)]
pub struct DischargeCli {
    /// Configuration file (default: $NORDPEAK_CONFIG or ./nordpeak.toml)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Test mode: find the peak and log it without writing to the inverter
    #[arg(long)]
    pub test: bool,

    /// Read the status register to verify the Modbus link, then exit
    #[arg(long, conflicts_with = "test")]
    pub check_connection: bool,
}
