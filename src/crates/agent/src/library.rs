//! Per-session Code Library
//!
//! Holds validated read operations and their materialized results for the
//! lifetime of a query, and persists through the metadata store when a
//! query is suspended pending approval. Write scripts are reserved for
//! future write workflows but their dependency invariant is enforced now.

use crate::error::AgentError;
use chrono::Utc;
use metadata::repositories::SessionRepository;
use metadata::Database;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// One stored read operation and its result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResult {
    /// Step identifier, unique per session
    pub step_id: String,

    /// Exact source text of the read (graph query or probe program)
    pub source: String,

    /// Entity external ids observed
    pub entity_ids: Vec<String>,

    /// Full materialized rows retained for display
    pub rows: Vec<Value>,

    /// Fetch timestamp (RFC3339)
    pub fetched_at: String,
}

/// A validated write script awaiting approval (future write workflows)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteScript {
    /// Step identifier, unique per session
    pub step_id: String,

    /// Source text validated against a sandbox mock
    pub source: String,

    /// Target entity ids drawn from the referenced ReadResult
    pub target_ids: Vec<String>,

    /// Semantic action tag (e.g. `suspend_users`)
    pub action: String,

    /// Step id of the originating ReadResult
    pub depends_on: String,
}

/// An approval decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub approved: bool,
    pub approved_ids: Vec<String>,
    pub rejected_ids: Vec<String>,
    pub timestamp: String,
    pub user: String,
    pub note: String,
}

/// Diff produced by refreshing a read result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

/// The per-session library
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeLibrary {
    /// Opaque query identifier this library belongs to
    pub query_id: String,

    reads: BTreeMap<String, ReadResult>,
    writes: BTreeMap<String, WriteScript>,
    approvals: Vec<Approval>,
}

impl CodeLibrary {
    /// Create an empty library for a query
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            ..Default::default()
        }
    }

    /// Store an immutable read entry. Step ids are unique per session.
    pub fn append_read(
        &mut self,
        step_id: &str,
        source: &str,
        entity_ids: Vec<String>,
        rows: Vec<Value>,
    ) -> Result<(), AgentError> {
        if self.reads.contains_key(step_id) {
            return Err(AgentError::DuplicateStep(step_id.to_string()));
        }
        self.reads.insert(
            step_id.to_string(),
            ReadResult {
                step_id: step_id.to_string(),
                source: source.to_string(),
                entity_ids,
                rows,
                fetched_at: Utc::now().to_rfc3339(),
            },
        );
        Ok(())
    }

    /// Retrieve a read entry for display or dependency linking
    pub fn get_read(&self, step_id: &str) -> Option<&ReadResult> {
        self.reads.get(step_id)
    }

    /// Number of stored reads
    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    /// Re-execute bookkeeping: replace a read's ids and rows, stamping a
    /// fresh fetch time, and return the id diff against the prior state.
    pub fn refresh_read(
        &mut self,
        step_id: &str,
        new_ids: Vec<String>,
        new_rows: Vec<Value>,
    ) -> Result<RefreshDiff, AgentError> {
        let entry = self
            .reads
            .get_mut(step_id)
            .ok_or_else(|| AgentError::UnknownDependency(step_id.to_string()))?;

        let old: BTreeSet<&String> = entry.entity_ids.iter().collect();
        let new: BTreeSet<&String> = new_ids.iter().collect();

        let diff = RefreshDiff {
            added: new.difference(&old).map(|s| (*s).clone()).collect(),
            removed: old.difference(&new).map(|s| (*s).clone()).collect(),
            unchanged: old.intersection(&new).map(|s| (*s).clone()).collect(),
        };

        entry.entity_ids = new_ids;
        entry.rows = new_rows;
        entry.fetched_at = Utc::now().to_rfc3339();
        Ok(diff)
    }

    /// Register a write script. Its `depends_on` must name a stored read;
    /// execution against the upstream uses only the stored id list.
    pub fn add_write_script(&mut self, script: WriteScript) -> Result<(), AgentError> {
        if !self.reads.contains_key(&script.depends_on) {
            return Err(AgentError::UnknownDependency(script.depends_on.clone()));
        }
        if self.writes.contains_key(&script.step_id) {
            return Err(AgentError::DuplicateStep(script.step_id.clone()));
        }
        self.writes.insert(script.step_id.clone(), script);
        Ok(())
    }

    /// Record an approval decision
    pub fn record_approval(&mut self, approval: Approval) {
        self.approvals.push(approval);
    }

    /// Approval history, oldest first
    pub fn approvals(&self) -> &[Approval] {
        &self.approvals
    }

    /// Serialize the full library state to the metadata store, keyed by
    /// the browser session row.
    pub async fn persist(&self, db: &Database, session_id: &str) -> Result<(), AgentError> {
        let blob = serde_json::to_string(self).map_err(|e| AgentError::Persistence(e.to_string()))?;
        SessionRepository::set_state(db.pool(), session_id, &blob)
            .await
            .map_err(|e| AgentError::Persistence(e.to_string()))
    }

    /// Restore a persisted library
    pub async fn load(db: &Database, session_id: &str) -> Result<Option<Self>, AgentError> {
        let blob = SessionRepository::get_state(db.pool(), session_id)
            .await
            .map_err(|e| AgentError::Persistence(e.to_string()))?;
        match blob {
            None => Ok(None),
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| AgentError::Persistence(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn library_with_read() -> CodeLibrary {
        let mut lib = CodeLibrary::new("q1");
        lib.append_read(
            "step-1",
            "MATCH (p:Person) RETURN p.id",
            vec!["p1".to_string(), "p2".to_string()],
            vec![json!({"id": "p1"}), json!({"id": "p2"})],
        )
        .unwrap();
        lib
    }

    #[test]
    fn step_ids_are_unique() {
        let mut lib = library_with_read();
        let err = lib
            .append_read("step-1", "other", vec![], vec![])
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicateStep(_)));
    }

    #[test]
    fn refresh_computes_the_diff_and_replaces_state() {
        let mut lib = library_with_read();
        let diff = lib
            .refresh_read(
                "step-1",
                vec!["p2".to_string(), "p3".to_string()],
                vec![json!({"id": "p2"}), json!({"id": "p3"})],
            )
            .unwrap();

        assert_eq!(diff.added, vec!["p3".to_string()]);
        assert_eq!(diff.removed, vec!["p1".to_string()]);
        assert_eq!(diff.unchanged, vec!["p2".to_string()]);

        let entry = lib.get_read("step-1").unwrap();
        assert_eq!(entry.entity_ids, vec!["p2".to_string(), "p3".to_string()]);
    }

    #[test]
    fn write_scripts_require_an_existing_read() {
        let mut lib = library_with_read();

        let orphan = WriteScript {
            step_id: "w1".to_string(),
            source: "client.deactivate(ids)".to_string(),
            target_ids: vec!["p1".to_string()],
            action: "deactivate_users".to_string(),
            depends_on: "step-404".to_string(),
        };
        assert!(matches!(
            lib.add_write_script(orphan),
            Err(AgentError::UnknownDependency(_))
        ));

        let linked = WriteScript {
            step_id: "w1".to_string(),
            source: "client.deactivate(ids)".to_string(),
            target_ids: vec!["p1".to_string()],
            action: "deactivate_users".to_string(),
            depends_on: "step-1".to_string(),
        };
        lib.add_write_script(linked).unwrap();
    }

    #[tokio::test]
    async fn persistence_round_trips_byte_for_byte() {
        let db = Database::open_in_memory().await.unwrap();
        let user = metadata::repositories::UserRepository::create(
            db.pool(),
            "alice",
            "a@example.com",
            "pw",
        )
        .await
        .unwrap();
        let session = SessionRepository::create(db.pool(), &user.id, 3600)
            .await
            .unwrap();

        let mut lib = library_with_read();
        lib.record_approval(Approval {
            approved: true,
            approved_ids: vec!["p1".to_string()],
            rejected_ids: vec!["p2".to_string()],
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            user: "alice".to_string(),
            note: "looks right".to_string(),
        });

        lib.persist(&db, &session.id).await.unwrap();
        let restored = CodeLibrary::load(&db, &session.id).await.unwrap().unwrap();

        assert_eq!(
            serde_json::to_string(&lib).unwrap(),
            serde_json::to_string(&restored).unwrap()
        );
    }
}
