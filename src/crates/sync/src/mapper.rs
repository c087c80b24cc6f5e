//! Upstream JSON to graph node mapping
//!
//! Profile fields arrive camelCase and leave snake_case. Profile keys
//! outside the known map are tenant-defined custom attributes; the writer
//! adds them to the Person schema with additive DDL before loading.

use graphstore::{Node, PropertyValue};
use serde_json::Value;

/// Known camelCase profile key -> Person column
const PROFILE_MAP: [(&str, &str); 28] = [
    ("email", "email"),
    ("login", "login"),
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("middleName", "middle_name"),
    ("displayName", "display_name"),
    ("nickName", "nick_name"),
    ("honorificPrefix", "honorific_prefix"),
    ("honorificSuffix", "honorific_suffix"),
    ("mobilePhone", "mobile_phone"),
    ("primaryPhone", "primary_phone"),
    ("streetAddress", "street_address"),
    ("city", "city"),
    ("state", "state"),
    ("zipCode", "zip_code"),
    ("countryCode", "country_code"),
    ("postalAddress", "postal_address"),
    ("department", "department"),
    ("title", "title"),
    ("manager", "manager"),
    ("managerId", "manager_id"),
    ("employeeNumber", "employee_number"),
    ("division", "division"),
    ("organization", "organization"),
    ("costCenter", "cost_center"),
    ("userType", "user_type"),
    ("secondEmail", "second_email"),
    ("profileUrl", "profile_url"),
];

/// Map an upstream user status onto the snapshot's status enum
pub fn map_status(upstream: &str) -> &'static str {
    match upstream {
        "ACTIVE" => "active",
        "SUSPENDED" => "suspended",
        "LOCKED_OUT" => "locked",
        "DEPROVISIONED" => "deprovisioned",
        "STAGED" | "PROVISIONED" => "staged",
        "RECOVERY" => "recovery",
        "PASSWORD_EXPIRED" => "password_expired",
        _ => "staged",
    }
}

/// Profile keys that are custom attributes in this payload
pub fn custom_attribute_keys(user: &Value) -> Vec<String> {
    let Some(profile) = user["profile"].as_object() else {
        return Vec::new();
    };
    profile
        .keys()
        .filter(|key| {
            !PROFILE_MAP.iter().any(|(camel, _)| camel == key)
                && !matches!(key.as_str(), "preferredLanguage" | "locale" | "timezone")
        })
        .map(|key| key.to_lowercase())
        .collect()
}

/// Build a Person node from an upstream user payload
pub fn person_node(user: &Value) -> Option<Node> {
    let id = user["id"].as_str()?;
    let mut node = Node::new(id);

    if let Some(status) = user["status"].as_str() {
        node = node.with_text("status", map_status(status));
    }
    for (source, column) in [
        ("created", "created"),
        ("activated", "activated"),
        ("lastLogin", "last_login"),
        ("statusChanged", "status_changed"),
        ("passwordChanged", "password_changed"),
        ("transitioningToStatus", "transitioning_to_status"),
    ] {
        if let Some(value) = user.get(source).filter(|v| !v.is_null()) {
            node = node.with(column, PropertyValue::from_json(value));
        }
    }

    if let Some(profile) = user["profile"].as_object() {
        for (key, value) in profile {
            if value.is_null() {
                continue;
            }
            let column = PROFILE_MAP
                .iter()
                .find(|(camel, _)| camel == key)
                .map(|(_, snake)| snake.to_string())
                .unwrap_or_else(|| match key.as_str() {
                    "preferredLanguage" => "preferred_language".to_string(),
                    other => other.to_lowercase(),
                });
            node = node.with(column, PropertyValue::from_json(value));
        }
    }

    Some(node)
}

/// Build a Team node from an upstream group payload
pub fn team_node(group: &Value) -> Option<Node> {
    let id = group["id"].as_str()?;
    let mut node = Node::new(id).with("type", PropertyValue::from_json(&group["type"]));

    if let Some(profile) = group["profile"].as_object() {
        for (key, column) in [("name", "name"), ("description", "description")] {
            if let Some(value) = profile.get(key).filter(|v| !v.is_null()) {
                node = node.with(column, PropertyValue::from_json(value));
            }
        }
    }
    for (source, column) in [
        ("created", "created"),
        ("lastUpdated", "last_updated"),
        ("lastMembershipUpdated", "last_membership_updated"),
    ] {
        if let Some(value) = group.get(source).filter(|v| !v.is_null()) {
            node = node.with(column, PropertyValue::from_json(value));
        }
    }
    Some(node)
}

/// Build an Application node from an upstream app payload
pub fn application_node(app: &Value) -> Option<Node> {
    let id = app["id"].as_str()?;
    let mut node = Node::new(id);

    for (source, column) in [
        ("name", "name"),
        ("label", "label"),
        ("status", "status"),
        ("signOnMode", "sign_on_mode"),
        ("created", "created"),
        ("lastUpdated", "last_updated"),
    ] {
        if let Some(value) = app.get(source).filter(|v| !v.is_null()) {
            node = node.with(column, PropertyValue::from_json(value));
        }
    }

    let hide = &app["visibility"]["hide"];
    if !hide.is_null() {
        node = node
            .with("hide_web", PropertyValue::from_json(&hide["web"]))
            .with("hide_ios", PropertyValue::from_json(&hide["iOS"]));
    }
    Some(node)
}

/// Build a Factor node from an upstream factor payload
pub fn factor_node(factor: &Value) -> Option<Node> {
    let id = factor["id"].as_str()?;
    let mut node = Node::new(id);

    for (source, column) in [
        ("factorType", "factor_type"),
        ("provider", "provider"),
        ("vendorName", "vendor_name"),
        ("status", "status"),
        ("created", "created"),
        ("lastUpdated", "last_updated"),
    ] {
        if let Some(value) = factor.get(source).filter(|v| !v.is_null()) {
            node = node.with(column, PropertyValue::from_json(value));
        }
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_user() -> Value {
        json!({
            "id": "00u1",
            "status": "LOCKED_OUT",
            "created": "2025-01-01T00:00:00Z",
            "lastLogin": "2026-07-30T12:00:00Z",
            "profile": {
                "email": "kim@acme.com",
                "login": "kim@acme.com",
                "firstName": "Kim",
                "lastName": "Nguyen",
                "department": "Engineering",
                "badgeColor": "blue"
            }
        })
    }

    #[test]
    fn person_mapping_snake_cases_and_maps_status() {
        let node = person_node(&sample_user()).unwrap();
        assert_eq!(node.external_id, "00u1");
        assert_eq!(node.property("status").as_text(), Some("locked"));
        assert_eq!(node.property("first_name").as_text(), Some("Kim"));
        assert_eq!(node.property("last_login").as_text(), Some("2026-07-30T12:00:00Z"));
        // Custom attribute kept under its lowercased key
        assert_eq!(node.property("badgecolor").as_text(), Some("blue"));
    }

    #[test]
    fn custom_keys_exclude_the_known_profile_map() {
        let keys = custom_attribute_keys(&sample_user());
        assert_eq!(keys, vec!["badgecolor".to_string()]);
    }

    #[test]
    fn status_map_covers_the_enum() {
        assert_eq!(map_status("ACTIVE"), "active");
        assert_eq!(map_status("PROVISIONED"), "staged");
        assert_eq!(map_status("PASSWORD_EXPIRED"), "password_expired");
        assert_eq!(map_status("SOMETHING_NEW"), "staged");
    }

    #[test]
    fn group_and_app_and_factor_mapping() {
        let team = team_node(&json!({
            "id": "00g1",
            "type": "OKTA_GROUP",
            "profile": {"name": "Platform", "description": "Core infra"},
            "lastUpdated": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(team.property("name").as_text(), Some("Platform"));

        let app = application_node(&json!({
            "id": "0oa1",
            "label": "Jira",
            "status": "ACTIVE",
            "signOnMode": "SAML_2_0",
            "visibility": {"hide": {"web": false, "iOS": true}}
        }))
        .unwrap();
        assert_eq!(app.property("sign_on_mode").as_text(), Some("SAML_2_0"));
        assert_eq!(app.property("hide_ios"), PropertyValue::Bool(true));

        let factor = factor_node(&json!({
            "id": "mfa1",
            "factorType": "token:software:totp",
            "provider": "OKTA",
            "status": "ACTIVE"
        }))
        .unwrap();
        assert_eq!(factor.property("factor_type").as_text(), Some("token:software:totp"));
    }

    #[test]
    fn payloads_without_ids_are_skipped() {
        assert!(person_node(&json!({"status": "ACTIVE"})).is_none());
        assert!(team_node(&json!({})).is_none());
    }
}
