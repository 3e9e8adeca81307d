//! Reconciliation of `PagerDuty` resources.
//!
//! Every managed object type implements [`Resource`]: create, read, update,
//! delete and import against a shared [`PagerDutyApi`] client, operating on a
//! typed [`ResourceData`]. Objects that disappeared remotely are reported by
//! clearing the ID rather than as errors.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pagerform_provider::{ProviderConfig, Resource, ResourceData, UserAttrs, UserResource};
//!
//! # async fn example() -> Result<(), pagerform_provider::ProviderError> {
//! let api = ProviderConfig::from_env().client().await?;
//!
//! let mut user = ResourceData::new(UserAttrs {
//!     name: "Earline Greenholt".into(),
//!     email: "earline@example.com".into(),
//!     ..UserAttrs::default()
//! });
//! UserResource.create(api.as_ref(), &mut user).await?;
//! println!("created {:?}", user.id());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod expand;
pub mod lookup;
pub mod resource;
pub mod resources;
pub mod retry;
pub mod sweep;
pub mod validation;

pub use config::ProviderConfig;
pub use error::ProviderError;
pub use lookup::{lookup_escalation_policy, lookup_service, lookup_team, lookup_user, lookup_vendor};
pub use resource::{Resource, ResourceData};
pub use resources::{
    AddonAttrs, AddonResource, EscalationPolicyAttrs, EscalationPolicyResource, ExtensionAttrs,
    ExtensionResource, MaintenanceWindowAttrs, MaintenanceWindowResource,
    ServiceIntegrationAttrs, ServiceIntegrationResource, TeamMembershipAttrs,
    TeamMembershipResource, UserAttrs, UserResource,
};
pub use retry::{RetryPolicy, RetryStrategy};
pub use sweep::sweep_addons;
