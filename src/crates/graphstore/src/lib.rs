//! Versioned embedded property-graph snapshot engine
//!
//! Tenant state lives in immutable on-disk snapshot versions under
//! `snap_v<N>` directories. A single writer builds the next version in a
//! staging directory while any number of readers query the current one;
//! promotion is an atomic in-memory counter increment. The `query` module
//! provides the restricted read-only query language the agent generates
//! against a snapshot.

pub mod error;
pub mod model;
pub mod query;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod writer;

pub use error::{GraphError, Result};
pub use model::{LabelCounts, Node, PropertyValue};
pub use query::{run_query, Table};
pub use schema::{GraphSchema, LABELS, RELATIONSHIPS};
pub use snapshot::GraphSnapshot;
pub use store::{PromotionReport, SnapshotStore};
pub use writer::SnapshotWriter;
