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

//! SolaX EMS1000 adapter: programs timed discharges over Modbus TCP or RTU.

mod controller;
mod link;
mod registers;

#[cfg(test)]
mod test_slave;

pub use controller::SolaxModbusController;
pub use registers::TimedDischarge;

use nordpeak_core::DischargeController;
use nordpeak_types::InverterConfig;
use std::sync::Arc;

/// Factory function to create the discharge controller for the configured inverter
pub fn create_controller(config: &InverterConfig) -> Arc<dyn DischargeController> {
    Arc::new(SolaxModbusController::new(config.clone()))
}
