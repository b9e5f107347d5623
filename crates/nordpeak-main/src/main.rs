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

//! `nordpeak`: daily Nord Pool fetch, peak discharge, tomorrow monitoring

use anyhow::Result;
use clap::Parser;
use nordpeak_core::{NordPoolClient, SystemClock};
use nordpeak_main::cli::FetchCli;
use nordpeak_main::{FetchOptions, start};
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = FetchCli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal: {e:#}");
            eprintln!("nordpeak: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: FetchCli) -> Result<ExitCode> {
    let app = start(cli.config.as_deref())?;

    let client = NordPoolClient::new(&app.config().fetcher)?;
    let controller = nordpeak_solax::create_controller(&app.config().inverter);

    let report = app
        .run_fetcher(
            &client,
            controller.as_ref(),
            &SystemClock,
            FetchOptions {
                test_today: cli.test_today,
                dry_run: cli.dry_run,
            },
        )
        .await?;

    Ok(if report.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
