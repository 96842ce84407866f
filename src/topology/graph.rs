use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;

use log::trace;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::config::PRETTY_INDENT;
use crate::error::CrawlerError;

use super::{NeighborEntry, NetworkDocument, Switch, SwitchEntry};

struct Node {
    switch: Switch,
    neighbors: HashSet<IpAddr>,
}

/// Undirected graph of switches keyed by address.
///
/// Nodes live in an address-keyed arena and edges refer to addresses, so
/// cyclic topologies need no shared ownership.
#[derive(Default)]
pub struct TopologyGraph {
    nodes: HashMap<IpAddr, Node>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `switch` as a node. Re-adding a known address keeps the
    /// existing node untouched.
    pub fn add_switch(&mut self, switch: Switch) -> Result<(), CrawlerError> {
        if !switch.has_address() {
            return Err(CrawlerError::EmptySwitchAddress);
        }

        self.nodes.entry(switch.address()).or_insert_with(|| {
            trace!("Add node: {}", switch);
            Node {
                switch,
                neighbors: HashSet::new(),
            }
        });
        Ok(())
    }

    /// Links two known switches in both directions.
    pub fn add_link(&mut self, from: &Switch, to: &Switch) -> Result<(), CrawlerError> {
        for sw in [from, to] {
            if !self.nodes.contains_key(&sw.address()) {
                return Err(CrawlerError::SwitchNotInNetwork(sw.address()));
            }
        }
        if from == to {
            return Err(CrawlerError::SelfLinkRejected(from.address()));
        }

        for (a, b) in [(from, to), (to, from)] {
            if let Some(node) = self.nodes.get_mut(&a.address()) {
                node.neighbors.insert(b.address());
            }
        }
        trace!("Add link: {} <-> {}", from.address(), to.address());
        Ok(())
    }

    /// Returns the neighbors of `switch` in no particular order.
    pub fn neighbors_of(&self, switch: &Switch) -> Result<Vec<Switch>, CrawlerError> {
        let node = self
            .nodes
            .get(&switch.address())
            .ok_or(CrawlerError::SwitchNotInNetwork(switch.address()))?;

        Ok(node
            .neighbors
            .iter()
            .filter_map(|addr| self.nodes.get(addr))
            .map(|n| n.switch.clone())
            .collect())
    }

    /// Looks up the stored node for `address`.
    pub fn switch(&self, address: IpAddr) -> Option<&Switch> {
        self.nodes.get(&address).map(|n| &n.switch)
    }

    pub fn contains(&self, switch: &Switch) -> bool {
        self.nodes.contains_key(&switch.address())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Projects the graph into its serializable document form.
    ///
    /// Neither the node list nor the neighbor lists have a defined order.
    pub fn to_document(&self) -> NetworkDocument {
        let network = self
            .nodes
            .values()
            .map(|node| SwitchEntry {
                name: node.switch.name().to_string(),
                address: node.switch.address().to_string(),
                neighbors: node
                    .neighbors
                    .iter()
                    .filter_map(|addr| self.nodes.get(addr))
                    .map(|n| NeighborEntry {
                        name: n.switch.name().to_string(),
                        address: n.switch.address().to_string(),
                    })
                    .collect(),
            })
            .collect();

        NetworkDocument { network }
    }

    pub fn to_json(&self) -> Result<String, CrawlerError> {
        Ok(serde_json::to_string(&self.to_document())?)
    }

    /// Same document as [`to_json`](Self::to_json), indented for humans.
    pub fn to_pretty_json(&self) -> Result<String, CrawlerError> {
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(PRETTY_INDENT);
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.to_document().serialize(&mut ser)?;
        // serde_json only emits valid UTF-8
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl fmt::Display for TopologyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::TopologyGraph;
    use crate::error::CrawlerError;
    use crate::topology::{NetworkDocument, Switch};
    use std::collections::HashSet;

    fn sw(addr: &str, name: &str) -> Switch {
        Switch::new(addr).expect("test address should parse").with_name(name)
    }

    fn names(switches: Vec<Switch>) -> HashSet<String> {
        switches.into_iter().map(|s| s.name().to_string()).collect()
    }

    fn build_chain() -> (TopologyGraph, Vec<Switch>) {
        let switches: Vec<Switch> = (1..=5)
            .map(|i| sw(&format!("192.168.1.{i}"), &format!("sw{i}")))
            .collect();
        let mut graph = TopologyGraph::new();
        for s in &switches {
            graph.add_switch(s.clone()).expect("add switch");
        }
        for (a, b) in [(0, 1), (1, 2), (1, 3), (2, 4)] {
            graph.add_link(&switches[a], &switches[b]).expect("add link");
        }
        (graph, switches)
    }

    #[test]
    fn neighbors_are_reported_for_every_node() {
        let (graph, switches) = build_chain();
        let expected: [&[&str]; 5] = [
            &["sw2"],
            &["sw1", "sw3", "sw4"],
            &["sw2", "sw5"],
            &["sw2"],
            &["sw3"],
        ];

        for (s, want) in switches.iter().zip(expected) {
            let got = names(graph.neighbors_of(s).expect("known switch"));
            let want: HashSet<String> = want.iter().map(|n| n.to_string()).collect();
            assert_eq!(got, want, "neighbors of {s}");
        }
    }

    #[test]
    fn links_are_symmetric() {
        let mut graph = TopologyGraph::new();
        let a = sw("10.0.0.1", "a");
        let b = sw("10.0.0.2", "b");
        graph.add_switch(a.clone()).expect("add a");
        graph.add_switch(b.clone()).expect("add b");

        graph.add_link(&b, &a).expect("link");

        assert!(graph.neighbors_of(&a).expect("a known").contains(&b));
        assert!(graph.neighbors_of(&b).expect("b known").contains(&a));
    }

    #[test]
    fn link_to_unknown_switch_is_rejected() {
        let mut graph = TopologyGraph::new();
        let a = sw("10.0.0.1", "a");
        let b = sw("10.0.0.2", "b");

        match graph.add_link(&a, &b) {
            Err(CrawlerError::SwitchNotInNetwork(addr)) => assert_eq!(addr, a.address()),
            other => panic!("unexpected result: {other:?}"),
        }

        graph.add_switch(a.clone()).expect("add a");
        match graph.add_link(&a, &b) {
            Err(CrawlerError::SwitchNotInNetwork(addr)) => assert_eq!(addr, b.address()),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn self_link_is_rejected_even_for_known_switch() {
        let mut graph = TopologyGraph::new();
        let a = sw("10.0.0.1", "a");
        graph.add_switch(a.clone()).expect("add a");

        assert!(matches!(
            graph.add_link(&a, &a.clone().with_name("other")),
            Err(CrawlerError::SelfLinkRejected(_))
        ));
        assert!(graph.neighbors_of(&a).expect("known").is_empty());
    }

    #[test]
    fn re_adding_a_switch_is_a_no_op() {
        let mut graph = TopologyGraph::new();
        graph.add_switch(sw("10.0.0.1", "first")).expect("add");
        graph.add_switch(sw("10.0.0.1", "second")).expect("re-add");

        assert_eq!(graph.len(), 1);
        let stored = graph
            .switch("10.0.0.1".parse().expect("valid"))
            .expect("stored node");
        assert_eq!(stored.name(), "first");
    }

    #[test]
    fn unspecified_address_is_not_a_node() {
        let mut graph = TopologyGraph::new();

        assert!(matches!(
            graph.add_switch(sw("0.0.0.0", "ghost")),
            Err(CrawlerError::EmptySwitchAddress)
        ));
        assert!(graph.is_empty());
    }

    #[test]
    fn neighbors_of_unknown_switch_fails() {
        let graph = TopologyGraph::new();

        assert!(matches!(
            graph.neighbors_of(&sw("10.0.0.1", "a")),
            Err(CrawlerError::SwitchNotInNetwork(_))
        ));
    }

    #[test]
    fn json_omits_neighbors_key_for_isolated_nodes() {
        let mut graph = TopologyGraph::new();
        graph.add_switch(sw("10.0.0.1", "lonely")).expect("add");

        assert_eq!(
            graph.to_json().expect("serialize"),
            r#"{"network":[{"name":"lonely","address":"10.0.0.1"}]}"#
        );
    }

    #[test]
    fn json_round_trips_the_graph_shape() {
        let (graph, _) = build_chain();
        let doc: NetworkDocument =
            serde_json::from_str(&graph.to_json().expect("serialize")).expect("parse back");

        assert_eq!(doc.network.len(), 5);
        let sw2 = doc
            .network
            .iter()
            .find(|e| e.name == "sw2")
            .expect("sw2 entry");
        let mut addrs: Vec<&str> = sw2.neighbors.iter().map(|n| n.address.as_str()).collect();
        addrs.sort_unstable();
        assert_eq!(addrs, vec!["192.168.1.1", "192.168.1.3", "192.168.1.4"]);
    }

    #[test]
    fn pretty_json_uses_three_space_indent() {
        let mut graph = TopologyGraph::new();
        graph.add_switch(sw("10.0.0.1", "core")).expect("add");

        let pretty = graph.to_pretty_json().expect("serialize");
        assert!(pretty.starts_with("{\n   \"network\": [\n      {"));
        assert_eq!(graph.to_string(), graph.to_json().expect("serialize"));
    }
}
