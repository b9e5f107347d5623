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

//! `nordpeak-discharge`: program the battery for the peak of the saved prices

use anyhow::Result;
use clap::Parser;
use nordpeak_core::{DischargeMode, SystemClock};
use nordpeak_main::cli::DischargeCli;
use nordpeak_main::start;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = DischargeCli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal: {e:#}");
            eprintln!("nordpeak-discharge: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: DischargeCli) -> Result<ExitCode> {
    let app = start(cli.config.as_deref())?;
    let controller = nordpeak_solax::create_controller(&app.config().inverter);

    if cli.check_connection {
        app.check_connection(controller.as_ref()).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let mode = if cli.test {
        DischargeMode::DryRun
    } else {
        DischargeMode::Live
    };
    let outcome = app
        .run_discharge(controller.as_ref(), &SystemClock, mode)
        .await?;

    Ok(if outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
