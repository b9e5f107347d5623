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

use crate::link::ModbusLink;
use crate::registers::TimedDischarge;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveTime;
use nordpeak_core::DischargeController;
use nordpeak_types::{InverterConfig, ModbusTransportKind, SolaxRegisters};
use std::time::Duration;
use tracing::{debug, info};

/// SolaX EMS1000 programmed over Modbus.
///
/// A fresh connection is opened per operation; the controller runs at most a
/// couple of times a day and the EMS drops idle TCP sessions.
#[derive(Debug, Clone)]
pub struct SolaxModbusController {
    config: InverterConfig,
    name: String,
}

impl SolaxModbusController {
    #[must_use]
    pub fn new(config: InverterConfig) -> Self {
        let name = match config.transport {
            ModbusTransportKind::Tcp => format!("SolaX Modbus TCP {}:{}", config.host, config.port),
            ModbusTransportKind::Rtu => format!("SolaX Modbus RTU {}", config.serial_device),
        };
        Self { config, name }
    }

    async fn connect(&self) -> Result<ModbusLink> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let link = match self.config.transport {
            ModbusTransportKind::Tcp => {
                ModbusLink::connect_tcp(&self.config.host, self.config.port, self.config.unit_id, timeout)
                    .await
                    .with_context(|| {
                        format!("Connection failed: {}:{}", self.config.host, self.config.port)
                    })?
            }
            ModbusTransportKind::Rtu => ModbusLink::open_rtu(
                &self.config.serial_device,
                self.config.baud_rate,
                self.config.unit_id,
                timeout,
            )
            .with_context(|| format!("Connection failed: {}", self.config.serial_device))?,
        };
        debug!("Connected to {}", link.endpoint());
        Ok(link)
    }
}

/// Write the programme register by register, stopping at the first failure
async fn write_programme(
    link: &mut ModbusLink,
    registers: &SolaxRegisters,
    programme: TimedDischarge,
) -> Result<()> {
    for (address, value) in programme.writes(registers) {
        link.write_register(address, value)
            .await
            .with_context(|| format!("Modbus error writing {value} to {address:#06X}"))?;
    }
    Ok(())
}

#[async_trait]
impl DischargeController for SolaxModbusController {
    async fn schedule_discharge(&self, start: NaiveTime, duration_min: u16) -> Result<()> {
        let mut link = self.connect().await?;
        write_programme(&mut link, &self.config.registers, TimedDischarge::new(start, duration_min))
            .await?;

        info!(
            "Programmed timed discharge {} for {duration_min} min on {}",
            start.format("%H:%M"),
            link.endpoint()
        );
        Ok(())
    }

    async fn read_status(&self) -> Result<u16> {
        let mut link = self.connect().await?;
        let address = self.config.registers.status_register;
        link.read_register(address)
            .await
            .with_context(|| format!("Modbus error reading {address:#06X}"))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
