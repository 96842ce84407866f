//! Address allow-list bounding the crawl.
//!
//! An [`AddressFilter`] holds single host addresses and network ranges. A
//! neighbor is only followed when the filter allows its address; an empty
//! filter falls back to a configured default policy.

use std::collections::HashSet;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use log::trace;

use crate::error::CrawlerError;

#[derive(Debug, Clone, Default)]
pub struct AddressFilter {
    singletons: HashSet<IpAddr>,
    ranges: Vec<IpNetwork>,
    allow_any_if_empty: bool,
}

impl AddressFilter {
    pub fn new(allow_any_if_empty: bool) -> Self {
        Self {
            singletons: HashSet::new(),
            ranges: Vec::new(),
            allow_any_if_empty,
        }
    }

    /// Adds a single address (`192.168.1.1`) or an address with mask
    /// (`192.168.1.0/24`).
    ///
    /// A mask covering the whole address width (`/32`, `/128`) is stored as a
    /// singleton rather than a one-host range.
    pub fn add(&mut self, spec: &str) -> Result<(), CrawlerError> {
        let invalid = || CrawlerError::InvalidAddressSpec(spec.to_string());

        if spec.contains('/') {
            let network: IpNetwork = spec.parse().map_err(|_| invalid())?;
            if network.prefix() == full_width(network.ip()) {
                trace!("Filter singleton from full mask: {}", network.ip());
                self.singletons.insert(network.ip());
            } else {
                trace!("Filter range: {}", network);
                self.ranges.push(network);
            }
            return Ok(());
        }

        let addr: IpAddr = spec.parse().map_err(|_| invalid())?;
        self.singletons.insert(addr);
        Ok(())
    }

    /// Returns whether `address` may be crawled.
    ///
    /// `None` (an address that could not be parsed) is never allowed.
    pub fn allow(&self, address: Option<IpAddr>) -> bool {
        let Some(address) = address else {
            return false;
        };

        if self.is_empty() {
            return self.allow_any_if_empty;
        }

        self.singletons.contains(&address) || self.ranges.iter().any(|net| net.contains(address))
    }

    /// Parses `address` and checks it against the filter.
    pub fn allow_str(&self, address: &str) -> bool {
        self.allow(address.trim().parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty() && self.ranges.is_empty()
    }
}

fn full_width(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}
