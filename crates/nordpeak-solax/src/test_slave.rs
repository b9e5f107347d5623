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

//! In-process EMS1000 stand-in served by the tokio-modbus server

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::{self, Ready};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_modbus::server::Service;
use tokio_modbus::server::tcp::{Server as TcpServer, accept_tcp_connection};
use tokio_modbus::server::rtu::Server as RtuServer;
use tokio_modbus::{ExceptionCode, Request, Response, SlaveRequest};
use tokio_serial::SerialStream;

#[derive(Debug, Default)]
struct SlaveState {
    registers: HashMap<u16, u16>,
    rejected: HashSet<u16>,
    writes: Vec<(u8, u16, u16)>,
}

#[derive(Debug, Clone, Default)]
pub struct TestSlave {
    state: Arc<Mutex<SlaveState>>,
}

impl TestSlave {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_register(&self, address: u16, value: u16) {
        self.state.lock().registers.insert(address, value);
    }

    /// Answer any access to `address` with IllegalDataAddress
    pub fn reject_address(&self, address: u16) {
        self.state.lock().rejected.insert(address);
    }

    /// (unit, address, value) in arrival order
    pub fn writes(&self) -> Vec<(u8, u16, u16)> {
        self.state.lock().writes.clone()
    }

    /// Listen on an ephemeral localhost port and return it
    pub async fn serve_tcp(&self) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = TcpServer::new(listener);

        let slave = self.clone();
        let new_service = move |_peer: SocketAddr| -> io::Result<Option<TestSlave>> {
            Ok(Some(slave.clone()))
        };
        let on_connected = move |stream: TcpStream, peer: SocketAddr| {
            let new_service = new_service.clone();
            async move { accept_tcp_connection(stream, peer, new_service) }
        };
        tokio::spawn(async move {
            let _ = server.serve(&on_connected, |_err| {}).await;
        });

        port
    }

    /// Answer RTU requests arriving on `port`
    pub fn serve_rtu(&self, port: SerialStream) {
        let server = RtuServer::new(port);
        let slave = self.clone();
        tokio::spawn(async move {
            let _ = server.serve_forever(slave).await;
        });
    }

    fn handle(&self, unit: u8, request: Request<'static>) -> Result<Response, ExceptionCode> {
        let mut state = self.state.lock();
        match request {
            Request::ReadHoldingRegisters(address, count) => {
                let range = address..address.saturating_add(count);
                if range.clone().any(|a| state.rejected.contains(&a)) {
                    return Err(ExceptionCode::IllegalDataAddress);
                }
                let values = range
                    .map(|a| state.registers.get(&a).copied().unwrap_or(0))
                    .collect();
                Ok(Response::ReadHoldingRegisters(values))
            }
            Request::WriteSingleRegister(address, value) => {
                if state.rejected.contains(&address) {
                    return Err(ExceptionCode::IllegalDataAddress);
                }
                state.registers.insert(address, value);
                state.writes.push((unit, address, value));
                Ok(Response::WriteSingleRegister(address, value))
            }
            _ => Err(ExceptionCode::IllegalFunction),
        }
    }
}

impl Service for TestSlave {
    type Request = SlaveRequest<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        future::ready(self.handle(req.slave, req.request))
    }
}
