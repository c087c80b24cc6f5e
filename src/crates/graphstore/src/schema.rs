//! Graph schema: labels, relationships, and per-label columns
//!
//! Person carries a large base profile plus tenant-defined dynamic columns
//! added by additive DDL at sync time. Column removal is unsupported;
//! columns absent from a later sync stay in the schema with null values.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Node labels in the graph
pub const LABELS: [&str; 4] = ["Person", "Team", "Application", "Factor"];

/// Relationships: (name, from label, to label). Names are globally unique
/// across the graph, a constraint of the embedded engine.
pub const RELATIONSHIPS: [(&str, &str, &str); 4] = [
    ("MEMBER_OF", "Person", "Team"),
    ("HAS_ACCESS", "Person", "Application"),
    ("GROUP_HAS_ACCESS", "Team", "Application"),
    ("ENROLLED", "Person", "Factor"),
];

/// Invariant Person columns: identity, status, and timestamps
pub const PERSON_CORE_COLUMNS: [&str; 10] = [
    "id",
    "email",
    "login",
    "first_name",
    "last_name",
    "status",
    "created",
    "activated",
    "last_login",
    "status_changed",
];

/// Best-effort Person profile columns
pub const PERSON_PROFILE_COLUMNS: [&str; 29] = [
    "mobile_phone",
    "primary_phone",
    "street_address",
    "city",
    "state",
    "zip_code",
    "country_code",
    "department",
    "title",
    "manager",
    "manager_id",
    "employee_number",
    "division",
    "organization",
    "cost_center",
    "user_type",
    "second_email",
    "honorific_prefix",
    "honorific_suffix",
    "display_name",
    "middle_name",
    "nick_name",
    "profile_url",
    "preferred_language",
    "locale",
    "timezone",
    "password_changed",
    "transitioning_to_status",
    "postal_address",
];

const TEAM_COLUMNS: [&str; 7] = [
    "id",
    "name",
    "description",
    "type",
    "created",
    "last_updated",
    "last_membership_updated",
];

const APPLICATION_COLUMNS: [&str; 9] = [
    "id",
    "name",
    "label",
    "status",
    "sign_on_mode",
    "created",
    "last_updated",
    "hide_web",
    "hide_ios",
];

const FACTOR_COLUMNS: [&str; 7] = [
    "id",
    "factor_type",
    "provider",
    "vendor_name",
    "status",
    "created",
    "last_updated",
];

/// Valid Person status values
pub const PERSON_STATUSES: [&str; 7] = [
    "active",
    "suspended",
    "locked",
    "deprovisioned",
    "staged",
    "recovery",
    "password_expired",
];

/// Schema for one snapshot version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSchema {
    /// Tenant-defined Person columns added at sync time
    person_dynamic: BTreeSet<String>,
}

impl GraphSchema {
    /// Schema with no dynamic columns
    pub fn new() -> Self {
        Self {
            person_dynamic: BTreeSet::new(),
        }
    }

    /// Additive DDL: register a tenant-defined Person column.
    ///
    /// Re-adding an existing column is a no-op; base columns cannot be
    /// shadowed.
    pub fn add_person_attribute(&mut self, name: &str) -> Result<()> {
        if !is_valid_column_name(name) {
            return Err(GraphError::Parse(format!(
                "invalid column name: '{}'",
                name
            )));
        }
        if Self::person_base_has(name) {
            return Ok(());
        }
        self.person_dynamic.insert(name.to_string());
        Ok(())
    }

    /// Dynamic Person columns in sorted order
    pub fn person_dynamic_columns(&self) -> impl Iterator<Item = &str> {
        self.person_dynamic.iter().map(|s| s.as_str())
    }

    /// Whether `column` exists on `label`
    pub fn has_column(&self, label: &str, column: &str) -> bool {
        match label {
            "Person" => Self::person_base_has(column) || self.person_dynamic.contains(column),
            "Team" => TEAM_COLUMNS.contains(&column),
            "Application" => APPLICATION_COLUMNS.contains(&column),
            "Factor" => FACTOR_COLUMNS.contains(&column),
            _ => false,
        }
    }

    fn person_base_has(column: &str) -> bool {
        PERSON_CORE_COLUMNS.contains(&column) || PERSON_PROFILE_COLUMNS.contains(&column)
    }
}

impl Default for GraphSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up a relationship by name
pub fn relationship(name: &str) -> Option<(&'static str, &'static str)> {
    RELATIONSHIPS
        .iter()
        .find(|(rel, _, _)| *rel == name)
        .map(|(_, from, to)| (*from, *to))
}

/// Whether `label` is a known node label
pub fn is_label(label: &str) -> bool {
    LABELS.contains(&label)
}

fn is_valid_column_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_columns_are_known() {
        let schema = GraphSchema::new();
        assert!(schema.has_column("Person", "email"));
        assert!(schema.has_column("Person", "employee_number"));
        assert!(schema.has_column("Team", "name"));
        assert!(schema.has_column("Application", "sign_on_mode"));
        assert!(schema.has_column("Factor", "factor_type"));
        assert!(!schema.has_column("Person", "shoe_size"));
    }

    #[test]
    fn dynamic_columns_are_additive() {
        let mut schema = GraphSchema::new();
        schema.add_person_attribute("badge_color").unwrap();
        assert!(schema.has_column("Person", "badge_color"));

        // Re-adding is a no-op
        schema.add_person_attribute("badge_color").unwrap();
        assert_eq!(schema.person_dynamic_columns().count(), 1);

        // Base columns cannot be shadowed
        schema.add_person_attribute("email").unwrap();
        assert_eq!(schema.person_dynamic_columns().count(), 1);
    }

    #[test]
    fn invalid_column_names_are_rejected() {
        let mut schema = GraphSchema::new();
        assert!(schema.add_person_attribute("9lives").is_err());
        assert!(schema.add_person_attribute("drop table").is_err());
        assert!(schema.add_person_attribute("").is_err());
    }

    #[test]
    fn relationship_endpoints() {
        assert_eq!(relationship("MEMBER_OF"), Some(("Person", "Team")));
        assert_eq!(relationship("GROUP_HAS_ACCESS"), Some(("Team", "Application")));
        assert_eq!(relationship("OWNS"), None);
    }

    #[test]
    fn relationship_names_are_globally_unique() {
        let mut names: Vec<&str> = RELATIONSHIPS.iter().map(|(n, _, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RELATIONSHIPS.len());
    }
}
