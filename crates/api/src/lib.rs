//! `PagerDuty` REST API v2 client for pagerform.
//!
//! This crate provides the wire types for the resources pagerform manages,
//! the object-safe [`PagerDutyApi`] trait that the reconciliation handlers
//! call through, and [`PagerDutyClient`], the `reqwest` implementation that
//! talks to <https://api.pagerduty.com>.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pagerform_api::{PagerDutyApi, PagerDutyClient};
//!
//! # async fn example() -> Result<(), pagerform_api::ApiError> {
//! let client = PagerDutyClient::builder("your-api-token").build()?;
//! let abilities = client.list_abilities().await?;
//! println!("account abilities: {abilities:?}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod types;

pub use api::PagerDutyApi;
pub use client::{PagerDutyClient, PagerDutyClientBuilder};
pub use error::ApiError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockPagerDuty;
pub use types::{
    Addon, ApiObject, ApiReference, EscalationPolicy, EscalationRule, Extension, Integration,
    MaintenanceWindow, Member, Service, Team, User, Vendor,
};
