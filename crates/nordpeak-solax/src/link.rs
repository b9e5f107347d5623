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

//! One open Modbus session with the EMS1000, over TCP or RTU

use anyhow::{Context, Result, anyhow, bail};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_modbus::Slave;
use tokio_modbus::client::{Context as ModbusContext, Reader, Writer, rtu, tcp};
use tokio_serial::SerialStream;

#[derive(Debug)]
pub struct ModbusLink {
    ctx: ModbusContext,
    endpoint: String,
    timeout: Duration,
}

impl ModbusLink {
    pub async fn connect_tcp(host: &str, port: u16, unit_id: u8, timeout: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| anyhow!("no answer within {timeout:?}"))??;
        stream.set_nodelay(true)?;

        Ok(Self {
            ctx: tcp::attach_slave(stream, Slave(unit_id)),
            endpoint: format!("{host}:{port} unit {unit_id}"),
            timeout,
        })
    }

    /// Open `device` at 8N1 and `baud_rate`
    pub fn open_rtu(device: &str, baud_rate: u32, unit_id: u8, timeout: Duration) -> Result<Self> {
        let builder = tokio_serial::new(device, baud_rate).timeout(timeout);
        let port = SerialStream::open(&builder)?;
        Ok(Self::attach_rtu(port, device, unit_id, timeout))
    }

    pub(crate) fn attach_rtu(port: SerialStream, device: &str, unit_id: u8, timeout: Duration) -> Self {
        Self {
            ctx: rtu::attach_slave(port, Slave(unit_id)),
            endpoint: format!("{device} unit {unit_id}"),
            timeout,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn read_register(&mut self, address: u16) -> Result<u16> {
        let values = within(self.timeout, self.ctx.read_holding_registers(address, 1)).await?;
        values
            .first()
            .copied()
            .with_context(|| format!("Empty reply reading {address:#06X}"))
    }

    pub async fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        within(self.timeout, self.ctx.write_single_register(address, value)).await
    }
}

/// Await one request, flattening timeout, transport and exception failures
async fn within<T>(
    timeout: Duration,
    request: impl Future<Output = tokio_modbus::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, request).await {
        Err(_) => bail!("no response within {timeout:?}"),
        Ok(Err(e)) => Err(e.into()),
        Ok(Ok(Err(code))) => bail!("slave exception {code:?}"),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_slave::TestSlave;

    const TIMEOUT: Duration = Duration::from_millis(300);

    fn rtu_pair() -> (ModbusLink, SerialStream) {
        let (master, slave_end) = SerialStream::pair().unwrap();
        (ModbusLink::attach_rtu(master, "pty", 3, TIMEOUT), slave_end)
    }

    #[tokio::test]
    async fn test_rtu_write_is_acknowledged() {
        let slave = TestSlave::new();
        let (mut link, slave_end) = rtu_pair();
        slave.serve_rtu(slave_end);

        link.write_register(0x011A, 18).await.unwrap();
        assert_eq!(slave.writes(), vec![(3, 0x011A, 18)]);
    }

    #[tokio::test]
    async fn test_rtu_read_register() {
        let slave = TestSlave::new();
        slave.set_register(0x0000, 77);
        let (mut link, slave_end) = rtu_pair();
        slave.serve_rtu(slave_end);

        assert_eq!(link.read_register(0x0000).await.unwrap(), 77);
    }

    #[tokio::test]
    async fn test_rtu_exception_reply() {
        let slave = TestSlave::new();
        slave.reject_address(0x011C);
        let (mut link, slave_end) = rtu_pair();
        slave.serve_rtu(slave_end);

        let err = link.write_register(0x011C, 15).await.unwrap_err();
        assert!(err.to_string().contains("IllegalDataAddress"), "{err:#}");
        assert!(slave.writes().is_empty());
    }

    #[tokio::test]
    async fn test_rtu_silent_slave_times_out() {
        let (mut link, _slave_end) = rtu_pair();

        let err = link.read_register(0x0000).await.unwrap_err();
        assert!(err.to_string().contains("no response within"), "{err:#}");
    }

    #[tokio::test]
    async fn test_tcp_silent_slave_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let mut link = ModbusLink::connect_tcp("127.0.0.1", port, 1, TIMEOUT).await.unwrap();
        let err = link.write_register(0x0100, 35).await.unwrap_err();
        assert!(err.to_string().contains("no response within"), "{err:#}");
    }

    #[tokio::test]
    async fn test_tcp_endpoint_label() {
        let slave = TestSlave::new();
        let port = slave.serve_tcp().await;

        let link = ModbusLink::connect_tcp("127.0.0.1", port, 5, TIMEOUT).await.unwrap();
        assert_eq!(link.endpoint(), format!("127.0.0.1:{port} unit 5"));
    }
}
