//! Restricted read-only query language
//!
//! A small Cypher-like dialect: MATCH patterns over labeled nodes and
//! single-hop relationships, WHERE filters, RETURN projections with
//! DISTINCT / ORDER BY / LIMIT, and UNION for the canonical union-access
//! pattern. Anything that would mutate the graph is rejected before
//! parsing.

pub mod ast;
pub mod exec;
pub mod parser;
pub mod safety;
pub mod table;

pub use table::Table;

use crate::error::Result;
use crate::snapshot::GraphSnapshot;

/// Run a query against a snapshot.
///
/// The pipeline is safety filter, parse, validate against the snapshot
/// schema, execute. Results are deterministic for a given snapshot version
/// (up to row order when no ORDER BY is present, which is still stable
/// because node iteration order is).
pub fn run_query(snapshot: &GraphSnapshot, text: &str) -> Result<Table> {
    safety::check(text)?;
    let query = parser::parse(text)?;
    exec::execute(snapshot, &query)
}
