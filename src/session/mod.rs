//! Telnet CLI sessions and neighbor table retrieval.
//!
//! This module drives a [`PromptScanner`] over a byte-stream [`Transport`]:
//! it logs into a switch, reads its prompt name and scrapes the output of
//! `show cdp neighbors detail` into a [`NeighborReport`].
//!
//! # Main Components
//!
//! - [`Transport`] - Narrow byte-stream interface the session runs on
//! - [`SessionClient`] - Login and neighbor retrieval state machine driver
//! - [`NeighborReport`] - Identity and neighbor list of a visited switch
//! - [`TelnetTransport`] - TCP telnet implementation of [`Transport`]

use std::fmt;
use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{self, DEVICE_SEPARATOR};
use crate::device::{PromptScanner, SessionState, Step};
use crate::error::CrawlerError;

pub use parse::parse_neighbors;
pub use telnet::TelnetTransport;

/// Byte-stream transport consumed by [`SessionClient`].
///
/// `read` returning `Ok(0)` means "no data yet, poll again"; an error is
/// fatal for the session. Implementations may pause after every `write` to
/// pace the remote CLI.
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self, address: IpAddr, port: u16) -> io::Result<()>;

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    async fn close(&mut self) -> io::Result<()>;
}

/// Name and address of a switch plus the neighbors it reported.
///
/// Records inside `neighbors` never carry neighbors of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborReport {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub neighbors: Vec<NeighborReport>,
}

impl NeighborReport {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            neighbors: Vec::new(),
        }
    }
}

impl fmt::Display for NeighborReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NeighborReport {{Name: {}, Address: {}",
            self.name, self.address
        )?;
        if self.neighbors.is_empty() {
            return f.write_str("}");
        }
        f.write_str(", Neighbors: [")?;
        for (i, n) in self.neighbors.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{n}")?;
        }
        f.write_str("]}")
    }
}

/// A CLI session against one switch at a time.
pub struct SessionClient<T> {
    transport: T,
    scanner: PromptScanner,
    connected: bool,
    verbose: bool,
    port: u16,
    report: NeighborReport,
}

mod client;
mod parse;
mod telnet;
