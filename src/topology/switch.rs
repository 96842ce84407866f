use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use crate::error::CrawlerError;

/// A switch identified by its management address.
///
/// Equality and hashing only look at the address; the display name is
/// mutable metadata filled in once the switch is visited or reported.
#[derive(Debug, Clone)]
pub struct Switch {
    address: IpAddr,
    name: String,
}

impl Switch {
    /// Creates a switch from an IP literal.
    pub fn new(address: &str) -> Result<Self, CrawlerError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(CrawlerError::EmptySwitchAddress);
        }
        let address = trimmed
            .parse()
            .map_err(|_| CrawlerError::InvalidAddress(address.to_string()))?;
        Ok(Self::from_addr(address))
    }

    pub fn from_addr(address: IpAddr) -> Self {
        Self {
            address,
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Returns false for `0.0.0.0` and `::`, which do not identify a host.
    pub fn has_address(&self) -> bool {
        !self.address.is_unspecified()
    }
}

impl PartialEq for Switch {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Switch {}

impl Hash for Switch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Switch {{Name: {}, Address: {}}}", self.name, self.address)
    }
}
