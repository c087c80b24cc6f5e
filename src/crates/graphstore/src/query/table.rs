//! Columnar query results

use crate::model::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A materialized result table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Output column names
    pub columns: Vec<String>,

    /// Rows in column order
    pub rows: Vec<Vec<PropertyValue>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Convert rows to JSON objects keyed by column name, the shape the
    /// streaming fabric sends to clients.
    pub fn to_row_objects(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = serde_json::Map::new();
                for (column, value) in self.columns.iter().zip(row) {
                    object.insert(column.clone(), value.to_json());
                }
                serde_json::Value::Object(object)
            })
            .collect()
    }

    /// Remove duplicate rows, preserving first-seen order
    pub fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| {
            let key = serde_json::Value::Array(row.iter().map(|v| v.to_json()).collect());
            seen.insert(key.to_string())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_objects_pair_columns_with_values() {
        let mut table = Table::new(vec!["email".to_string(), "status".to_string()]);
        table.rows.push(vec![
            PropertyValue::Text("kim@acme.com".to_string()),
            PropertyValue::Text("active".to_string()),
        ]);

        let objects = table.to_row_objects();
        assert_eq!(objects[0]["email"], "kim@acme.com");
        assert_eq!(objects[0]["status"], "active");
    }

    #[test]
    fn dedupe_preserves_first_seen_order() {
        let mut table = Table::new(vec!["id".to_string()]);
        for id in ["a", "b", "a", "c", "b"] {
            table.rows.push(vec![PropertyValue::Text(id.to_string())]);
        }
        table.dedupe();

        let ids: Vec<_> = table.rows.iter().map(|r| r[0].as_text().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
