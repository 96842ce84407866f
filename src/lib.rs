//! # cdp-crawler - Cisco Switch Topology Discovery
//!
//! `cdp-crawler` discovers the layer 2 topology of a Cisco switch fleet that
//! is only reachable through the legacy telnet CLI. It logs into every
//! switch, scrapes `show cdp neighbors detail` and follows the reported
//! neighbors breadth first until the reachable fleet is exhausted.
//!
//! ## Features
//!
//! - **Prompt State Machine**: Priority-ordered trigger set tolerant to arbitrarily fragmented output
//! - **Pagination Handling**: `--More--` markers are answered and stripped transparently
//! - **Address Filtering**: Crawl only approved addresses and networks, keep rejected neighbors as leaves
//! - **Cycle Safety**: Every switch is visited at most once
//! - **Cooperative Cancellation**: Stops between switches, never in the middle of a session
//! - **Async/Await**: Built on Tokio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cdp_crawler::config::{CrawlerConfig, Credentials};
//! use cdp_crawler::crawler::Crawler;
//! use cdp_crawler::session::{SessionClient, TelnetTransport};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlerConfig {
//!         include: vec!["10.0.0.0/24".to_string()],
//!         ..Default::default()
//!     };
//!
//!     let transport = TelnetTransport::new(config.write_delay(), config.read_timeout());
//!     let session = SessionClient::new(transport).with_port(config.telnet_port);
//!     let mut crawler = Crawler::new(session, config.address_filter()?)
//!         .with_poll_interval(config.poll_interval());
//!
//!     let credentials = Credentials::new("admin", "secret")?;
//!     let summary = crawler
//!         .build("10.0.0.1", &credentials, &CancellationToken::new())
//!         .await?;
//!
//!     println!("visited {} switches", summary.visited);
//!     println!("{}", crawler.graph().to_pretty_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`crawler::Crawler`] - Breadth-first crawl over the switch fleet
//! - [`session::SessionClient`] - Login and neighbor retrieval over a [`session::Transport`]
//! - [`device::PromptScanner`] - Transport-free CLI prompt state machine
//! - [`topology::TopologyGraph`] - Discovered switches and their links
//! - [`filter::AddressFilter`] - Addresses and networks allowed to be crawled
//! - [`error::CrawlerError`] - Error types for every layer
//! - [`config`] - CLI literals and crawler tunables

pub mod config;
pub mod crawler;
pub mod device;
pub mod error;
pub mod filter;
pub mod session;
pub mod topology;
