//! One [`Resource`](crate::Resource) implementation per managed object type.

pub mod addon;
pub mod escalation_policy;
pub mod extension;
pub mod maintenance_window;
pub mod service_integration;
pub mod team_membership;
pub mod user;

pub use addon::{AddonAttrs, AddonResource};
pub use escalation_policy::{EscalationPolicyAttrs, EscalationPolicyResource};
pub use extension::{ExtensionAttrs, ExtensionResource};
pub use maintenance_window::{MaintenanceWindowAttrs, MaintenanceWindowResource};
pub use service_integration::{ServiceIntegrationAttrs, ServiceIntegrationResource};
pub use team_membership::{TeamMembershipAttrs, TeamMembershipResource};
pub use user::{UserAttrs, UserResource};

/// Default `description` of objects created by pagerform.
pub const MANAGED_BY: &str = "Managed by Terraform";
