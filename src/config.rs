//! CLI literals and crawler tunables.
//!
//! The string constants below must match what Cisco IOS prints on its
//! telnet management interface byte for byte. Different platforms greet
//! with either `Username:` or `Login:`, so both are accepted.

use std::fmt;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::CrawlerError;
use crate::filter::AddressFilter;

pub const NEW_LINE: &str = "\n";
pub const SPACE: &str = " ";

pub const TXT_USERNAME: &str = "Username:";
pub const TXT_LOGIN: &str = "Login:";
pub const TXT_PASSWORD: &str = "Password:";

/// Banners printed by the switch when the credentials are rejected.
pub const AUTH_FAILURE_BANNERS: &[&str] = &["Authentication failed", "Login invalid", "Bad passwords"];

pub const TXT_TIMEOUT_EXPIRED: &str = "timeout expired";
pub const TXT_PROMPT: &str = ">";
pub const TXT_MORE: &str = "--More--";

/// Line separating per-device blocks in `show cdp neighbors detail`.
pub const DEVICE_SEPARATOR: &str = "-------------------------";

pub const CMD_SHOW_NEIGHBORS: &str = "sh cdp nei det";

/// Suffix appended to the name of a neighbor rejected by the address filter.
pub const DISCARD_MARKER: &str = ">>>DISCARDED";

pub const DEFAULT_TELNET_PORT: u16 = 23;

/// Switch polling interval. Polling more often makes the management plane
/// of older switches stop answering.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Pause after every write so the switch CLI can catch up.
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(200);

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Indentation used by the pretty JSON output.
pub const PRETTY_INDENT: &[u8] = b"   ";

/// Runtime configuration of a crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Echo every byte received from the switches to stderr.
    pub verbose: bool,

    /// Addresses (`10.0.0.1`) and networks (`10.0.0.0/24`) allowed to be crawled.
    pub include: Vec<String>,

    /// Allow every address when `include` is empty.
    pub allow_any_if_empty: bool,

    /// Indent the resulting JSON document.
    pub pretty: bool,

    pub telnet_port: u16,

    /// Pause before each switch is polled, in milliseconds.
    pub poll_interval_ms: u64,

    /// Settle delay after each transport write, in milliseconds.
    pub write_delay_ms: u64,

    /// Transport idle limit, in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            include: Vec::new(),
            allow_any_if_empty: true,
            pretty: false,
            telnet_port: DEFAULT_TELNET_PORT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            write_delay_ms: DEFAULT_WRITE_DELAY.as_millis() as u64,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
        }
    }
}

impl CrawlerConfig {
    /// Builds the address filter from `include`.
    ///
    /// Every token is trimmed and parsed independently; the first bad token
    /// aborts with [`CrawlerError::InvalidAddressSpec`].
    pub fn address_filter(&self) -> Result<AddressFilter, CrawlerError> {
        let mut filter = AddressFilter::new(self.allow_any_if_empty);
        for token in &self.include {
            filter.add(token.trim())?;
        }
        Ok(filter)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn write_delay(&self) -> Duration {
        Duration::from_millis(self.write_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Login credentials shared by every switch of the fleet.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Both parts are required; empty values are a configuration error.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, CrawlerError> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() {
            return Err(CrawlerError::MissingCredentials("username"));
        }
        if password.is_empty() {
            return Err(CrawlerError::MissingCredentials("password"));
        }
        Ok(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Splits a comma-separated include list, dropping empty tokens.
pub fn split_include_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
