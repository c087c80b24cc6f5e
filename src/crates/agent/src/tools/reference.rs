//! Reference data for the agent's lookup tools
//!
//! A compact index keeps the system prompt small; the full documentation
//! blobs are fetched on demand through `describe_operations`.

use serde_json::{json, Value};

/// REST operations the agent may name in probe programs
pub const OPERATIONS: [&str; 10] = [
    "list_users",
    "get_user",
    "list_user_groups",
    "list_user_factors",
    "list_groups",
    "list_group_members",
    "list_group_apps",
    "list_applications",
    "list_application_users",
    "get_logs",
];

/// Event-type categories for `get_detailed_event_types`
pub const EVENT_CATEGORIES: [&str; 4] = [
    "user_lifecycle",
    "authentication",
    "application_access",
    "group_membership",
];

/// The compact index returned by `load_reference`
pub fn reference_index(
    person_columns: Vec<String>,
    snapshot_available: bool,
) -> Value {
    json!({
        "graph": {
            "available": snapshot_available,
            "labels": {
                "Person": person_columns,
                "Team": ["id", "name", "description", "type", "created", "last_updated"],
                "Application": ["id", "name", "label", "status", "sign_on_mode", "created", "last_updated"],
                "Factor": ["id", "factor_type", "provider", "vendor_name", "status", "created"],
            },
            "relationships": [
                {"name": "MEMBER_OF", "from": "Person", "to": "Team"},
                {"name": "HAS_ACCESS", "from": "Person", "to": "Application"},
                {"name": "GROUP_HAS_ACCESS", "from": "Team", "to": "Application"},
                {"name": "ENROLLED", "from": "Person", "to": "Factor"},
            ],
        },
        "rest_operations": OPERATIONS,
        "event_categories": EVENT_CATEGORIES,
    })
}

/// Full documentation for one REST operation, or None if unknown
pub fn describe_operation(name: &str) -> Option<Value> {
    let doc = match name {
        "list_users" => json!({
            "operation": "list_users",
            "method": "GET",
            "path": "/api/v1/users",
            "parameters": {
                "search": "SCIM filter, e.g. status eq \"ACTIVE\" or profile.department eq \"Engineering\"",
                "limit": "page size; always 100",
            },
            "example": "client.get(\"/api/v1/users\", params={\"search\": 'status eq \"SUSPENDED\"', \"limit\": 100})",
            "caveats": "Paginated via Link headers; the client wrapper follows rel=\"next\" automatically.",
            "related": ["get_user", "list_user_groups"],
        }),
        "get_user" => json!({
            "operation": "get_user",
            "method": "GET",
            "path": "/api/v1/users/{id}",
            "parameters": {"id": "user id or login"},
            "example": "client.get(\"/api/v1/users/00u1abcd\")",
            "caveats": "Login lookups must be URL-encoded.",
            "related": ["list_users", "list_user_factors"],
        }),
        "list_user_groups" => json!({
            "operation": "list_user_groups",
            "method": "GET",
            "path": "/api/v1/users/{id}/groups",
            "parameters": {"id": "user id"},
            "example": "client.get(\"/api/v1/users/00u1abcd/groups\")",
            "caveats": "Returns built-in Everyone group too; filter by type if needed.",
            "related": ["list_group_members"],
        }),
        "list_user_factors" => json!({
            "operation": "list_user_factors",
            "method": "GET",
            "path": "/api/v1/users/{id}/factors",
            "parameters": {"id": "user id"},
            "example": "client.get(\"/api/v1/users/00u1abcd/factors\")",
            "caveats": "Factor status PENDING_ACTIVATION means enrollment incomplete.",
            "related": ["get_user"],
        }),
        "list_groups" => json!({
            "operation": "list_groups",
            "method": "GET",
            "path": "/api/v1/groups",
            "parameters": {"search": "e.g. profile.name sw \"Eng\"", "limit": "always 100"},
            "example": "client.get(\"/api/v1/groups\", params={\"limit\": 100})",
            "caveats": "Paginated via Link headers.",
            "related": ["list_group_members", "list_group_apps"],
        }),
        "list_group_members" => json!({
            "operation": "list_group_members",
            "method": "GET",
            "path": "/api/v1/groups/{id}/users",
            "parameters": {"id": "group id"},
            "example": "client.get(\"/api/v1/groups/00g1abcd/users\", params={\"limit\": 100})",
            "caveats": "Large groups paginate; let the wrapper follow Link headers.",
            "related": ["list_groups"],
        }),
        "list_group_apps" => json!({
            "operation": "list_group_apps",
            "method": "GET",
            "path": "/api/v1/groups/{id}/apps",
            "parameters": {"id": "group id"},
            "example": "client.get(\"/api/v1/groups/00g1abcd/apps\")",
            "caveats": "These are group-scoped assignments; union with direct user assignments for full access.",
            "related": ["list_application_users"],
        }),
        "list_applications" => json!({
            "operation": "list_applications",
            "method": "GET",
            "path": "/api/v1/apps",
            "parameters": {"q": "label substring", "limit": "always 100"},
            "example": "client.get(\"/api/v1/apps\", params={\"q\": \"Jira\", \"limit\": 100})",
            "caveats": "INACTIVE apps are included unless filtered.",
            "related": ["list_application_users"],
        }),
        "list_application_users" => json!({
            "operation": "list_application_users",
            "method": "GET",
            "path": "/api/v1/apps/{id}/users",
            "parameters": {"id": "application id"},
            "example": "client.get(\"/api/v1/apps/00a1abcd/users\", params={\"limit\": 100})",
            "caveats": "Includes both direct and group-sourced assignments; the scope field tells which.",
            "related": ["list_group_apps"],
        }),
        "get_logs" => json!({
            "operation": "get_logs",
            "method": "GET",
            "path": "/api/v1/logs",
            "parameters": {
                "filter": "e.g. eventType eq \"user.session.start\"",
                "since": "ISO8601 lower bound",
                "limit": "always 100",
            },
            "example": "client.get(\"/api/v1/logs\", params={\"filter\": 'eventType eq \"user.session.start\"', \"since\": \"2026-07-01T00:00:00Z\", \"limit\": 100})",
            "caveats": "Log queries are expensive; keep the window narrow. Use get_detailed_event_types for exact event-type ids.",
            "related": [],
        }),
        _ => return None,
    };
    Some(doc)
}

/// Event-type identifiers for a category, or None if unknown
pub fn event_types_for(category: &str) -> Option<Vec<&'static str>> {
    let types = match category {
        "user_lifecycle" => vec![
            "user.lifecycle.create",
            "user.lifecycle.activate",
            "user.lifecycle.deactivate",
            "user.lifecycle.suspend",
            "user.lifecycle.unsuspend",
            "user.lifecycle.delete.initiated",
        ],
        "authentication" => vec![
            "user.session.start",
            "user.session.end",
            "user.authentication.auth_via_mfa",
            "user.authentication.sso",
            "user.account.lock",
        ],
        "application_access" => vec![
            "application.user_membership.add",
            "application.user_membership.remove",
            "application.lifecycle.activate",
            "application.lifecycle.deactivate",
        ],
        "group_membership" => vec![
            "group.user_membership.add",
            "group.user_membership.remove",
            "group.lifecycle.create",
            "group.lifecycle.delete",
        ],
        _ => return None,
    };
    Some(types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_indexed_operation_has_documentation() {
        for operation in OPERATIONS {
            let doc = describe_operation(operation).unwrap();
            assert_eq!(doc["operation"], operation);
            assert_eq!(doc["method"], "GET");
            assert!(doc["example"].as_str().unwrap().contains("client.get"));
        }
        assert!(describe_operation("delete_user").is_none());
    }

    #[test]
    fn every_category_resolves() {
        for category in EVENT_CATEGORIES {
            assert!(!event_types_for(category).unwrap().is_empty());
        }
        assert!(event_types_for("bogus").is_none());
    }

    #[test]
    fn index_reflects_snapshot_availability() {
        let index = reference_index(vec!["id".to_string(), "email".to_string()], false);
        assert_eq!(index["graph"]["available"], false);
        assert_eq!(index["graph"]["labels"]["Person"][1], "email");
    }
}
