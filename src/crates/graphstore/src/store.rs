//! Versioned snapshot store
//!
//! Directory layout: `<root>/snap_v1`, `<root>/snap_v2`, ... The in-memory
//! version counter is rehydrated from the highest extant directory at
//! startup. Promotion swaps the cached current snapshot and bumps the
//! counter in one short critical section; readers that already hold an
//! `Arc` keep querying the old version undisturbed.

use crate::error::{GraphError, Result};
use crate::model::LabelCounts;
use crate::snapshot::{GraphSnapshot, PAYLOAD_FILE};
use crate::writer::{SnapshotWriter, WriterGuard};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// How many versions (current + previous) survive retention
const RETAINED_VERSIONS: u64 = 2;

/// Validation inputs for promotion, drawn from the sync's metadata row
#[derive(Debug, Clone)]
pub struct PromotionReport {
    /// Whether the sync completed successfully
    pub success: bool,

    /// Per-label node counts recorded by the writer
    pub counts: LabelCounts,

    /// Sync end time (RFC3339); absent means the sync never finished
    pub ended_at: Option<String>,
}

impl PromotionReport {
    fn check(&self) -> std::result::Result<(), String> {
        if !self.success {
            return Err("sync did not complete successfully".to_string());
        }
        if self.ended_at.is_none() {
            return Err("sync end time is missing".to_string());
        }
        if !self.counts.all_positive() {
            return Err("one or more label counts are zero".to_string());
        }
        Ok(())
    }
}

/// The versioned snapshot store
pub struct SnapshotStore {
    root: PathBuf,
    version: AtomicU64,
    current: RwLock<Option<Arc<GraphSnapshot>>>,
    writer_active: Arc<AtomicBool>,
}

impl SnapshotStore {
    /// Open a store rooted at `root`, creating the directory if needed and
    /// rehydrating the version counter from the highest extant directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let highest = Self::scan_versions(&root)?.into_iter().max().unwrap_or(0);
        let current = if highest > 0 {
            Some(Arc::new(GraphSnapshot::load(
                highest,
                &version_dir(&root, highest),
            )?))
        } else {
            None
        };

        if highest > 0 {
            tracing::info!(version = highest, "opened current snapshot version");
        } else {
            tracing::info!("no snapshot versions present; starting in no-snapshot mode");
        }

        Ok(Self {
            root,
            version: AtomicU64::new(highest),
            current: RwLock::new(current),
            writer_active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The current version number, or None before the first promotion
    pub fn current_version(&self) -> Option<u64> {
        match self.version.load(Ordering::SeqCst) {
            0 => None,
            v => Some(v),
        }
    }

    /// Handle to the current snapshot for reading.
    ///
    /// Any number of readers may hold handles concurrently; a handle stays
    /// valid across promotions and retention.
    pub fn current(&self) -> Result<Arc<GraphSnapshot>> {
        self.current.read().clone().ok_or(GraphError::NoSnapshot)
    }

    /// Attach a writer to a fresh staging version.
    ///
    /// Fails with `WriterConflict` while another writer is attached.
    pub fn begin_staging(&self) -> Result<SnapshotWriter> {
        if self
            .writer_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GraphError::WriterConflict);
        }
        let guard = WriterGuard {
            flag: self.writer_active.clone(),
        };

        // A retained-for-diagnosis directory may sit above the promoted
        // counter; staging always goes one past the highest of the two.
        let highest_dir = Self::scan_versions(&self.root)?.into_iter().max().unwrap_or(0);
        let staging = highest_dir.max(self.version.load(Ordering::SeqCst)) + 1;

        let dir = version_dir(&self.root, staging);
        std::fs::create_dir_all(&dir)?;
        tracing::info!(version = staging, "writer attached to staging version");

        // Dynamic columns carry forward; removal is unsupported
        let schema = self
            .current
            .read()
            .as_ref()
            .map(|snapshot| snapshot.schema().clone())
            .unwrap_or_default();

        Ok(SnapshotWriter::new(staging, dir, schema, guard))
    }

    /// Promote a persisted staging version to current.
    ///
    /// Validates the metadata-backed report, loads the payload, swaps the
    /// cached snapshot, bumps the counter, then applies retention. A failed
    /// validation leaves the staging directory in place for diagnosis.
    pub fn promote(&self, version: u64, report: &PromotionReport) -> Result<()> {
        if let Err(reason) = report.check() {
            tracing::warn!(version, %reason, "promotion rejected; staging retained");
            return Err(GraphError::NotPromotable { version, reason });
        }

        let snapshot = Arc::new(GraphSnapshot::load(version, &version_dir(&self.root, version))?);

        {
            let mut current = self.current.write();
            *current = Some(snapshot);
            self.version.store(version, Ordering::SeqCst);
        }
        tracing::info!(version, "snapshot promoted to current");

        self.apply_retention(version)?;
        Ok(())
    }

    /// Delete all version directories older than the retention window.
    ///
    /// In-flight readers are unaffected: loaded snapshots are fully
    /// resident behind `Arc`s, the in-process analog of the OS keeping an
    /// unlinked file alive while a handle is open.
    fn apply_retention(&self, current: u64) -> Result<()> {
        for version in Self::scan_versions(&self.root)? {
            if version + RETAINED_VERSIONS <= current {
                let dir = version_dir(&self.root, version);
                std::fs::remove_dir_all(&dir)?;
                tracing::info!(version, "retired snapshot version deleted");
            }
        }
        Ok(())
    }

    fn scan_versions(root: &Path) -> Result<Vec<u64>> {
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(rest) = name.to_str().and_then(|n| n.strip_prefix("snap_v")) else {
                continue;
            };
            if let Ok(version) = rest.parse::<u64>() {
                // Only directories with a payload count as extant versions
                if entry.path().join(PAYLOAD_FILE).is_file() {
                    versions.push(version);
                }
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }
}

fn version_dir(root: &Path, version: u64) -> PathBuf {
    root.join(format!("snap_v{}", version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::snapshot::person;

    fn passing_report(counts: LabelCounts) -> PromotionReport {
        PromotionReport {
            success: true,
            counts,
            ended_at: Some("2026-01-01T03:00:00Z".to_string()),
        }
    }

    fn build_version(store: &SnapshotStore, email: &str) -> (u64, LabelCounts) {
        let mut writer = store.begin_staging().unwrap();
        writer.upsert_node("Person", person("p1", email, "active")).unwrap();
        writer.upsert_node("Team", Node::new("t1")).unwrap();
        writer.upsert_node("Application", Node::new("a1")).unwrap();
        writer.upsert_node("Factor", Node::new("f1")).unwrap();
        writer.add_edge("MEMBER_OF", "p1", "t1").unwrap();
        let counts = writer.counts();
        let version = writer.finish().unwrap();
        (version, counts)
    }

    #[test]
    fn empty_store_reports_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(store.current_version(), None);
        assert!(matches!(store.current(), Err(GraphError::NoSnapshot)));
    }

    #[test]
    fn build_promote_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let (version, counts) = build_version(&store, "p1@acme.com");
        assert_eq!(version, 1);

        store.promote(version, &passing_report(counts)).unwrap();
        assert_eq!(store.current_version(), Some(1));

        let snapshot = store.current().unwrap();
        assert_eq!(
            snapshot.node("Person", "p1").unwrap().property("email").as_text(),
            Some("p1@acme.com")
        );
    }

    #[test]
    fn single_writer_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let writer = store.begin_staging().unwrap();
        assert!(matches!(store.begin_staging(), Err(GraphError::WriterConflict)));

        // Releasing the writer frees the slot
        writer.abort().unwrap();
        assert!(store.begin_staging().is_ok());
    }

    #[test]
    fn failed_validation_retains_staging() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let (version, _) = build_version(&store, "p1@acme.com");
        let report = PromotionReport {
            success: true,
            counts: LabelCounts::default(),
            ended_at: Some("2026-01-01T03:00:00Z".to_string()),
        };

        assert!(matches!(
            store.promote(version, &report),
            Err(GraphError::NotPromotable { .. })
        ));
        // Directory retained for diagnosis, version not current
        assert!(dir.path().join("snap_v1").join(PAYLOAD_FILE).is_file());
        assert_eq!(store.current_version(), None);
    }

    #[test]
    fn retention_keeps_two_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        for i in 0..3 {
            let (version, counts) = build_version(&store, &format!("p{}@acme.com", i));
            store.promote(version, &passing_report(counts)).unwrap();
        }

        assert_eq!(store.current_version(), Some(3));
        assert!(!dir.path().join("snap_v1").exists());
        assert!(dir.path().join("snap_v2").exists());
        assert!(dir.path().join("snap_v3").exists());
    }

    #[test]
    fn counter_rehydrates_from_highest_directory() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SnapshotStore::open(dir.path()).unwrap();
            for _ in 0..2 {
                let (version, counts) = build_version(&store, "p@acme.com");
                store.promote(version, &passing_report(counts)).unwrap();
            }
        }

        let reopened = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(reopened.current_version(), Some(2));
        assert!(reopened.current().is_ok());
    }

    #[test]
    fn dynamic_columns_carry_forward_across_versions() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let mut writer = store.begin_staging().unwrap();
        writer.add_person_attribute("badge_color").unwrap();
        writer.upsert_node("Person", person("p1", "p@acme.com", "active")).unwrap();
        writer.upsert_node("Team", Node::new("t1")).unwrap();
        writer.upsert_node("Application", Node::new("a1")).unwrap();
        writer.upsert_node("Factor", Node::new("f1")).unwrap();
        let counts = writer.counts();
        let version = writer.finish().unwrap();
        store.promote(version, &passing_report(counts)).unwrap();

        // The next sync does not mention the attribute; it must survive
        let (version, counts) = build_version(&store, "p@acme.com");
        store.promote(version, &passing_report(counts)).unwrap();

        let snapshot = store.current().unwrap();
        assert!(snapshot.schema().has_column("Person", "badge_color"));
        assert!(snapshot
            .node("Person", "p1")
            .unwrap()
            .property("badge_color")
            .is_null());
    }

    #[test]
    fn handles_survive_promotion_and_retention() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let (v1, c1) = build_version(&store, "old@acme.com");
        store.promote(v1, &passing_report(c1)).unwrap();
        let old_handle = store.current().unwrap();

        for i in 0..2 {
            let (v, c) = build_version(&store, &format!("new{}@acme.com", i));
            store.promote(v, &passing_report(c)).unwrap();
        }

        // v1's directory is gone but the held snapshot still answers
        assert!(!dir.path().join("snap_v1").exists());
        assert_eq!(
            old_handle.node("Person", "p1").unwrap().property("email").as_text(),
            Some("old@acme.com")
        );
    }
}
