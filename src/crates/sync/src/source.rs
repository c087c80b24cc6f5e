//! Tenant data source
//!
//! The writer consumes this trait rather than the HTTP client directly so
//! sync logic is testable against an in-memory tenant.

use async_trait::async_trait;
use okta_client::{OktaClient, Result};
use serde_json::Value;

/// Read access to the upstream tenant
#[async_trait]
pub trait TenantSource: Send + Sync {
    /// All groups
    async fn teams(&self) -> Result<Vec<Value>>;

    /// Applications assigned to one group
    async fn team_apps(&self, team_id: &str) -> Result<Vec<Value>>;

    /// All applications
    async fn applications(&self) -> Result<Vec<Value>>;

    /// All users
    async fn people(&self) -> Result<Vec<Value>>;

    /// Groups one user belongs to
    async fn person_teams(&self, user_id: &str) -> Result<Vec<Value>>;

    /// Factor enrollments for one user
    async fn person_factors(&self, user_id: &str) -> Result<Vec<Value>>;

    /// Assignments for one application (scope USER = direct)
    async fn application_users(&self, app_id: &str) -> Result<Vec<Value>>;
}

/// Live source backed by the GET-only client wrapper
pub struct OktaSource {
    client: OktaClient,
}

impl OktaSource {
    /// Wrap a configured client
    pub fn new(client: OktaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TenantSource for OktaSource {
    async fn teams(&self) -> Result<Vec<Value>> {
        self.client.get_paged("/api/v1/groups", &[]).await
    }

    async fn team_apps(&self, team_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_paged(&format!("/api/v1/groups/{}/apps", team_id), &[])
            .await
    }

    async fn applications(&self) -> Result<Vec<Value>> {
        self.client.get_paged("/api/v1/apps", &[]).await
    }

    async fn people(&self) -> Result<Vec<Value>> {
        self.client.get_paged("/api/v1/users", &[]).await
    }

    async fn person_teams(&self, user_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_paged(&format!("/api/v1/users/{}/groups", user_id), &[])
            .await
    }

    async fn person_factors(&self, user_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_paged(&format!("/api/v1/users/{}/factors", user_id), &[])
            .await
    }

    async fn application_users(&self, app_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_paged(&format!("/api/v1/apps/{}/users", app_id), &[])
            .await
    }
}
