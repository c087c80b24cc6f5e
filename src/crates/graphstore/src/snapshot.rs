//! Loaded snapshot data
//!
//! A `GraphSnapshot` is fully resident in memory and immutable. Readers hold
//! it behind an `Arc`, which is what makes eager deletion of superseded
//! version directories safe for in-flight queries.

use crate::error::{GraphError, Result};
use crate::model::{LabelCounts, Node, PropertyValue};
use crate::schema::GraphSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// File name of the serialized payload inside a version directory
pub const PAYLOAD_FILE: &str = "graph.bin";

/// Serialized graph payload
///
/// Everything is a BTree so iteration order, and therefore query output,
/// is deterministic for a given version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphData {
    /// Snapshot schema (base + dynamic columns)
    pub schema: GraphSchema,

    /// Nodes keyed by label, then external id
    pub nodes: BTreeMap<String, BTreeMap<String, Node>>,

    /// Edges keyed by relationship name: from id -> set of to ids
    pub edges: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

/// An immutable, queryable snapshot version
#[derive(Debug)]
pub struct GraphSnapshot {
    version: u64,
    data: GraphData,
    /// Reverse adjacency per relationship: to id -> set of from ids
    reverse: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl GraphSnapshot {
    /// Wrap loaded data, building the reverse adjacency index
    pub fn new(version: u64, data: GraphData) -> Self {
        let mut reverse: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();
        for (rel, adjacency) in &data.edges {
            let entry = reverse.entry(rel.clone()).or_default();
            for (from, tos) in adjacency {
                for to in tos {
                    entry.entry(to.clone()).or_default().insert(from.clone());
                }
            }
        }
        Self {
            version,
            data,
            reverse,
        }
    }

    /// Load a snapshot from its version directory
    pub fn load(version: u64, dir: &Path) -> Result<Self> {
        let path = dir.join(PAYLOAD_FILE);
        let bytes = std::fs::read(&path)?;
        let data: GraphData =
            bincode::deserialize(&bytes).map_err(|e| GraphError::Corrupt(e.to_string()))?;
        Ok(Self::new(version, data))
    }

    /// This snapshot's version number
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The snapshot schema
    pub fn schema(&self) -> &GraphSchema {
        &self.data.schema
    }

    /// Nodes of a label in external-id order
    pub fn nodes(&self, label: &str) -> impl Iterator<Item = &Node> {
        self.data
            .nodes
            .get(label)
            .into_iter()
            .flat_map(|by_id| by_id.values())
    }

    /// Look up one node
    pub fn node(&self, label: &str, external_id: &str) -> Option<&Node> {
        self.data.nodes.get(label)?.get(external_id)
    }

    /// Forward neighbors of `from` over `rel`
    pub fn out_neighbors(&self, rel: &str, from: &str) -> impl Iterator<Item = &str> {
        self.data
            .edges
            .get(rel)
            .and_then(|adj| adj.get(from))
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
    }

    /// Reverse neighbors of `to` over `rel`
    pub fn in_neighbors(&self, rel: &str, to: &str) -> impl Iterator<Item = &str> {
        self.reverse
            .get(rel)
            .and_then(|adj| adj.get(to))
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
    }

    /// Whether an edge exists
    pub fn has_edge(&self, rel: &str, from: &str, to: &str) -> bool {
        self.data
            .edges
            .get(rel)
            .and_then(|adj| adj.get(from))
            .is_some_and(|tos| tos.contains(to))
    }

    /// Node counts per label
    pub fn counts(&self) -> LabelCounts {
        let count = |label: &str| {
            self.data
                .nodes
                .get(label)
                .map(|by_id| by_id.len() as u64)
                .unwrap_or(0)
        };
        LabelCounts {
            people: count("Person"),
            teams: count("Team"),
            applications: count("Application"),
            factors: count("Factor"),
        }
    }

    /// The union-access set for one person: applications reachable through
    /// a direct assignment or one team hop. This is the canonical pattern
    /// queries must reproduce.
    pub fn accessible_applications(&self, person_id: &str) -> BTreeSet<String> {
        let mut apps: BTreeSet<String> =
            self.out_neighbors("HAS_ACCESS", person_id).map(String::from).collect();
        for team in self.out_neighbors("MEMBER_OF", person_id) {
            apps.extend(self.out_neighbors("GROUP_HAS_ACCESS", team).map(String::from));
        }
        apps
    }
}

/// Helper for assembling `GraphData` in tests and the sync writer
pub fn upsert_node(data: &mut GraphData, label: &str, node: Node) {
    data.nodes
        .entry(label.to_string())
        .or_default()
        .insert(node.external_id.clone(), node);
}

/// Insert an edge into `GraphData` without endpoint validation
pub fn insert_edge(data: &mut GraphData, rel: &str, from: &str, to: &str) {
    data.edges
        .entry(rel.to_string())
        .or_default()
        .entry(from.to_string())
        .or_default()
        .insert(to.to_string());
}

/// Convenience: a person node with the invariant columns set
pub fn person(id: &str, email: &str, status: &str) -> Node {
    Node::new(id)
        .with_text("email", email)
        .with_text("login", email)
        .with_text("status", status)
        .with("created", PropertyValue::Text("2026-01-01T00:00:00Z".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphSnapshot {
        let mut data = GraphData::default();
        upsert_node(&mut data, "Person", person("p1", "p1@acme.com", "active"));
        upsert_node(&mut data, "Team", Node::new("t1").with_text("name", "Engineering"));
        upsert_node(&mut data, "Application", Node::new("a1").with_text("label", "Jira"));
        upsert_node(&mut data, "Application", Node::new("a2").with_text("label", "Slack"));
        insert_edge(&mut data, "MEMBER_OF", "p1", "t1");
        insert_edge(&mut data, "GROUP_HAS_ACCESS", "t1", "a1");
        insert_edge(&mut data, "HAS_ACCESS", "p1", "a2");
        GraphSnapshot::new(1, data)
    }

    #[test]
    fn adjacency_lookups() {
        let snapshot = sample();
        assert!(snapshot.has_edge("MEMBER_OF", "p1", "t1"));
        assert!(!snapshot.has_edge("MEMBER_OF", "t1", "p1"));

        let members: Vec<&str> = snapshot.in_neighbors("MEMBER_OF", "t1").collect();
        assert_eq!(members, vec!["p1"]);
    }

    #[test]
    fn union_access_combines_both_paths() {
        let snapshot = sample();
        let apps = snapshot.accessible_applications("p1");
        assert_eq!(
            apps.into_iter().collect::<Vec<_>>(),
            vec!["a1".to_string(), "a2".to_string()]
        );
    }

    #[test]
    fn counts_by_label() {
        let counts = sample().counts();
        assert_eq!(counts.people, 1);
        assert_eq!(counts.applications, 2);
        assert_eq!(counts.factors, 0);
    }

    #[test]
    fn payload_round_trips_through_bincode() {
        let mut data = GraphData::default();
        upsert_node(&mut data, "Person", person("p1", "p1@acme.com", "active"));
        insert_edge(&mut data, "MEMBER_OF", "p1", "t1");

        let bytes = bincode::serialize(&data).unwrap();
        let restored: GraphData = bincode::deserialize(&bytes).unwrap();
        assert!(restored.nodes["Person"].contains_key("p1"));
        assert!(restored.edges["MEMBER_OF"]["p1"].contains("t1"));
    }
}
