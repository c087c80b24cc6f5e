//! Staging version writer
//!
//! Exactly one writer may be attached at a time; the store hands out the
//! guard. All upserts happen in memory against the staging data and are
//! persisted once by `finish`.

use crate::error::{GraphError, Result};
use crate::model::{LabelCounts, Node};
use crate::schema;
use crate::snapshot::{GraphData, PAYLOAD_FILE};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Releases the store's single-writer slot when dropped
pub(crate) struct WriterGuard {
    pub(crate) flag: Arc<AtomicBool>,
}

impl Drop for WriterGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Writer attached to a staging version directory
pub struct SnapshotWriter {
    version: u64,
    dir: PathBuf,
    data: GraphData,
    _guard: WriterGuard,
}

impl SnapshotWriter {
    /// `schema` carries forward the previous version's dynamic columns:
    /// column removal is unsupported, so attributes absent from this sync
    /// stay in the schema and read as null.
    pub(crate) fn new(
        version: u64,
        dir: PathBuf,
        schema: crate::schema::GraphSchema,
        guard: WriterGuard,
    ) -> Self {
        Self {
            version,
            dir,
            data: GraphData {
                schema,
                ..GraphData::default()
            },
            _guard: guard,
        }
    }

    /// The staging version number
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Additive DDL for a tenant-defined Person column
    pub fn add_person_attribute(&mut self, name: &str) -> Result<()> {
        self.data.schema.add_person_attribute(name)
    }

    /// Upsert a node under a label
    pub fn upsert_node(&mut self, label: &str, node: Node) -> Result<()> {
        if !schema::is_label(label) {
            return Err(GraphError::UnknownLabel(label.to_string()));
        }
        self.data
            .nodes
            .entry(label.to_string())
            .or_default()
            .insert(node.external_id.clone(), node);
        Ok(())
    }

    /// Insert an edge. Both endpoints must already exist in this staging
    /// version; the relationship name fixes the endpoint labels.
    pub fn add_edge(&mut self, rel: &str, from: &str, to: &str) -> Result<()> {
        let (from_label, to_label) = schema::relationship(rel)
            .ok_or_else(|| GraphError::UnknownRelationship(rel.to_string()))?;

        let endpoint_exists = |label: &str, id: &str| {
            self.data
                .nodes
                .get(label)
                .is_some_and(|by_id| by_id.contains_key(id))
        };

        if !endpoint_exists(from_label, from) {
            return Err(GraphError::DanglingEdge {
                rel: rel.to_string(),
                label: from_label.to_string(),
                id: from.to_string(),
            });
        }
        if !endpoint_exists(to_label, to) {
            return Err(GraphError::DanglingEdge {
                rel: rel.to_string(),
                label: to_label.to_string(),
                id: to.to_string(),
            });
        }

        self.data
            .edges
            .entry(rel.to_string())
            .or_default()
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        Ok(())
    }

    /// Current node counts per label
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

    /// Persist the staging version. The directory stays in `staging` state
    /// until the store promotes it.
    pub fn finish(self) -> Result<u64> {
        let bytes = bincode::serialize(&self.data)
            .map_err(|e| GraphError::Corrupt(e.to_string()))?;
        std::fs::write(self.dir.join(PAYLOAD_FILE), bytes)?;
        tracing::info!(version = self.version, "staging version persisted");
        Ok(self.version)
    }

    /// Abandon the staging version and delete its directory
    pub fn abort(self) -> Result<()> {
        tracing::warn!(version = self.version, "staging version aborted");
        std::fs::remove_dir_all(&self.dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::person;

    fn writer(dir: &std::path::Path) -> SnapshotWriter {
        let flag = Arc::new(AtomicBool::new(true));
        SnapshotWriter::new(
            1,
            dir.to_path_buf(),
            crate::schema::GraphSchema::new(),
            WriterGuard { flag },
        )
    }

    #[test]
    fn edges_require_existing_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = writer(dir.path());

        w.upsert_node("Person", person("p1", "p1@acme.com", "active")).unwrap();

        let err = w.add_edge("MEMBER_OF", "p1", "t-missing").unwrap_err();
        assert!(matches!(err, GraphError::DanglingEdge { .. }));

        w.upsert_node("Team", Node::new("t1")).unwrap();
        w.add_edge("MEMBER_OF", "p1", "t1").unwrap();
    }

    #[test]
    fn unknown_labels_and_relationships_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = writer(dir.path());

        assert!(matches!(
            w.upsert_node("Device", Node::new("d1")),
            Err(GraphError::UnknownLabel(_))
        ));
        assert!(matches!(
            w.add_edge("OWNS", "a", "b"),
            Err(GraphError::UnknownRelationship(_))
        ));
    }

    #[test]
    fn guard_releases_writer_slot_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let w = SnapshotWriter::new(
            1,
            dir.path().to_path_buf(),
            crate::schema::GraphSchema::new(),
            WriterGuard { flag: flag.clone() },
        );
        drop(w);
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn upserts_are_idempotent_by_external_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = writer(dir.path());

        w.upsert_node("Person", person("p1", "old@acme.com", "staged")).unwrap();
        w.upsert_node("Person", person("p1", "new@acme.com", "active")).unwrap();
        assert_eq!(w.counts().people, 1);
    }
}
