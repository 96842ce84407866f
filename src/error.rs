//! Error types for topology building, address filtering and CLI sessions.
//!
//! This module defines all errors that can occur while constructing the
//! switch graph, parsing filter configuration, and driving a switch CLI
//! session over the byte-stream transport.

use std::net::IpAddr;

use thiserror::Error;

/// Errors that can occur while crawling a switch fleet.
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// The text is not a valid IP literal.
    #[error("wrong switch ip address: {0}")]
    InvalidAddress(String),

    /// A switch without an address was offered to the graph.
    #[error("empty switch ip address")]
    EmptySwitchAddress,

    /// The switch has never been added to the graph.
    #[error("switch {0} has not been added to the network")]
    SwitchNotInNetwork(IpAddr),

    /// A link from a switch to itself was requested.
    #[error("attempt to link switch {0} with itself")]
    SelfLinkRejected(IpAddr),

    /// A filter token is neither an address nor an address with mask.
    #[error("invalid address or subnet: '{0}'")]
    InvalidAddressSpec(String),

    /// The switch rejected the configured credentials.
    ///
    /// Raised when one of the failure banners ("Authentication failed",
    /// "Login invalid", "Bad passwords") shows up during login.
    #[error("client connect [{0}]: authentication error")]
    AuthenticationFailure(IpAddr),

    /// The switch dropped the login exchange with "timeout expired".
    #[error("client connect [{0}]: timeout expired")]
    SessionTimeout(IpAddr),

    /// Neighbor retrieval was requested on a session that is not open.
    #[error("session is not connected")]
    NotConnected,

    /// `close` was called on a session that is not open.
    #[error("connection already closed{}", .0.map(|a| format!(" [{a}]")).unwrap_or_default())]
    AlreadyClosed(Option<IpAddr>),

    /// A required credential was not supplied.
    #[error("missing credential: {0}")]
    MissingCredentials(&'static str),

    /// The underlying byte-stream transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The topology document could not be rendered.
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}
