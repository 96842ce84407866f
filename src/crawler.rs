//! Breadth-first discovery of the switch fleet.
//!
//! The [`Crawler`] starts at a root switch, logs into every reachable switch
//! one at a time and follows the CDP neighbors the address filter allows.
//! A visited-address set is the only thing that stops it from looping on a
//! cyclic topology.

use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio_util::sync::CancellationToken;

use crate::config::{Credentials, DEFAULT_POLL_INTERVAL, DISCARD_MARKER};
use crate::error::CrawlerError;
use crate::filter::AddressFilter;
use crate::session::{NeighborReport, SessionClient, Transport};
use crate::topology::{Switch, TopologyGraph};

/// Pending FIFO plus the set of addresses already taken from it.
#[derive(Default)]
struct Frontier {
    pending: VecDeque<Switch>,
    visited: HashSet<IpAddr>,
}

impl Frontier {
    fn push(&mut self, switch: Switch) {
        self.pending.push_back(switch);
    }

    fn pop(&mut self) -> Option<Switch> {
        self.pending.pop_front()
    }

    /// Records `switch` as visited; false if it already was.
    fn mark_visited(&mut self, switch: &Switch) -> bool {
        self.visited.insert(switch.address())
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Outcome counters of one crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Switches whose session was attempted.
    pub visited: usize,
    /// Sessions that failed and were skipped.
    pub failed: usize,
    /// Candidates still queued when the crawl stopped.
    pub pending: usize,
    pub cancelled: bool,
}

pub struct Crawler<T> {
    session: SessionClient<T>,
    filter: AddressFilter,
    graph: TopologyGraph,
    poll_interval: Duration,
}

impl<T: Transport> Crawler<T> {
    pub fn new(session: SessionClient<T>, filter: AddressFilter) -> Self {
        Self {
            session,
            filter,
            graph: TopologyGraph::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn into_graph(self) -> TopologyGraph {
        self.graph
    }

    /// Crawls the fleet starting at `root`.
    ///
    /// Only an invalid or unspecified root address is an error, raised before
    /// any switch is contacted. Failing switches are logged and skipped.
    /// `cancel` is checked while waiting between switches and never
    /// interrupts a running session.
    pub async fn build(
        &mut self,
        root: &str,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<CrawlSummary, CrawlerError> {
        let root = Switch::new(root)?;
        if !root.has_address() {
            return Err(CrawlerError::EmptySwitchAddress);
        }
        let mut frontier = Frontier::default();
        frontier.push(root.clone());

        let mut summary = CrawlSummary::default();

        while !frontier.is_empty() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Crawl cancelled, {} candidates left", frontier.pending.len());
                    summary.cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let Some(mut current) = frontier.pop() else {
                break;
            };
            if !frontier.mark_visited(&current) {
                trace!("Already visited: {}", current.address());
                continue;
            }
            summary.visited += 1;

            let report = match self.poll(&current, credentials).await {
                Ok(report) => report,
                Err(e) => {
                    warn!("{}: {}", current.address(), e);
                    summary.failed += 1;
                    continue;
                }
            };
            info!(
                "{} ({}): {} neighbors",
                current.address(),
                report.name,
                report.neighbors.len()
            );

            if current == root {
                current.set_name(report.name.as_str());
                self.graph.add_switch(current.clone())?;
            }

            for neighbor in &report.neighbors {
                if let Some(next) = self.link_neighbor(&current, neighbor) {
                    frontier.push(next);
                }
            }
        }

        summary.pending = frontier.pending.len();
        Ok(summary)
    }

    /// Runs one full session against `switch`.
    async fn poll(
        &mut self,
        switch: &Switch,
        credentials: &Credentials,
    ) -> Result<NeighborReport, CrawlerError> {
        self.session
            .connect(
                &switch.address().to_string(),
                &credentials.username,
                &credentials.password,
            )
            .await?;
        let report = self.session.fetch_report().await;
        if self.session.is_connected() {
            if let Err(e) = self.session.close().await {
                debug!("{}: error closing session: {}", switch.address(), e);
            }
        }
        report
    }

    /// Adds `neighbor` to the graph next to `current`.
    ///
    /// Returns the switch to enqueue when the filter allows it; rejected
    /// neighbors stay in the graph as leaves carrying the discard marker.
    fn link_neighbor(&mut self, current: &Switch, neighbor: &NeighborReport) -> Option<Switch> {
        let mut switch = match Switch::new(&neighbor.address) {
            Ok(sw) => sw.with_name(neighbor.name.as_str()),
            Err(e) => {
                warn!("{}: neighbor {} skipped: {}", current.address(), neighbor.name, e);
                return None;
            }
        };

        let allowed = self.filter.allow(Some(switch.address()));
        if !allowed {
            debug!("{} discarded by filter", switch.address());
            switch.set_name(format!("{}{}", neighbor.name, DISCARD_MARKER));
        }

        let linked = self
            .graph
            .add_switch(switch.clone())
            .and_then(|_| self.graph.add_link(current, &switch));
        if let Err(e) = linked {
            warn!("{}: neighbor {} not linked: {}", current.address(), switch.address(), e);
            return None;
        }

        allowed.then_some(switch)
    }
}
