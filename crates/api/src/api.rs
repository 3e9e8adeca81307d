use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
    Addon, EscalationPolicy, Extension, Integration, MaintenanceWindow, Member, Service, Team,
    User, Vendor,
};

/// Object-safe view of the `PagerDuty` REST API v2.
///
/// Reconciliation handlers only ever talk to `PagerDuty` through this trait,
/// so tests can substitute an in-memory implementation for
/// [`PagerDutyClient`](crate::PagerDutyClient). Implementations must be safe
/// to share across tasks.
///
/// `list_*` methods return every page of results; `query` is passed to the
/// server-side filter and may be empty.
#[async_trait]
pub trait PagerDutyApi: Send + Sync {
    /// `GET /abilities`. Cheap call used to validate credentials.
    async fn list_abilities(&self) -> Result<Vec<String>, ApiError>;

    async fn list_users(&self, query: &str) -> Result<Vec<User>, ApiError>;
    async fn create_user(&self, user: &User) -> Result<User, ApiError>;
    async fn get_user(&self, id: &str) -> Result<User, ApiError>;
    async fn update_user(&self, id: &str, user: &User) -> Result<User, ApiError>;
    async fn delete_user(&self, id: &str) -> Result<(), ApiError>;

    async fn list_teams(&self, query: &str) -> Result<Vec<Team>, ApiError>;
    async fn get_team(&self, id: &str) -> Result<Team, ApiError>;
    async fn list_members(&self, team_id: &str) -> Result<Vec<Member>, ApiError>;
    /// `PUT /teams/{team}/users/{user}`; also changes the role of an existing member.
    async fn add_user_to_team(
        &self,
        team_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<(), ApiError>;
    async fn remove_user_from_team(&self, team_id: &str, user_id: &str) -> Result<(), ApiError>;

    async fn list_escalation_policies(&self, query: &str)
    -> Result<Vec<EscalationPolicy>, ApiError>;
    async fn create_escalation_policy(
        &self,
        policy: &EscalationPolicy,
    ) -> Result<EscalationPolicy, ApiError>;
    async fn get_escalation_policy(&self, id: &str) -> Result<EscalationPolicy, ApiError>;
    async fn update_escalation_policy(
        &self,
        id: &str,
        policy: &EscalationPolicy,
    ) -> Result<EscalationPolicy, ApiError>;
    async fn delete_escalation_policy(&self, id: &str) -> Result<(), ApiError>;

    async fn create_extension(&self, extension: &Extension) -> Result<Extension, ApiError>;
    async fn get_extension(&self, id: &str) -> Result<Extension, ApiError>;
    async fn update_extension(&self, id: &str, extension: &Extension)
    -> Result<Extension, ApiError>;
    async fn delete_extension(&self, id: &str) -> Result<(), ApiError>;

    async fn create_maintenance_window(
        &self,
        window: &MaintenanceWindow,
    ) -> Result<MaintenanceWindow, ApiError>;
    async fn get_maintenance_window(&self, id: &str) -> Result<MaintenanceWindow, ApiError>;
    async fn update_maintenance_window(
        &self,
        id: &str,
        window: &MaintenanceWindow,
    ) -> Result<MaintenanceWindow, ApiError>;
    async fn delete_maintenance_window(&self, id: &str) -> Result<(), ApiError>;

    async fn list_addons(&self) -> Result<Vec<Addon>, ApiError>;
    async fn create_addon(&self, addon: &Addon) -> Result<Addon, ApiError>;
    async fn get_addon(&self, id: &str) -> Result<Addon, ApiError>;
    async fn update_addon(&self, id: &str, addon: &Addon) -> Result<Addon, ApiError>;
    async fn delete_addon(&self, id: &str) -> Result<(), ApiError>;

    async fn list_vendors(&self, query: &str) -> Result<Vec<Vendor>, ApiError>;
    async fn list_services(&self, query: &str) -> Result<Vec<Service>, ApiError>;

    async fn create_integration(
        &self,
        service_id: &str,
        integration: &Integration,
    ) -> Result<Integration, ApiError>;
    async fn get_integration(&self, service_id: &str, id: &str)
    -> Result<Integration, ApiError>;
    async fn update_integration(
        &self,
        service_id: &str,
        id: &str,
        integration: &Integration,
    ) -> Result<Integration, ApiError>;
    async fn delete_integration(&self, service_id: &str, id: &str) -> Result<(), ApiError>;
}
