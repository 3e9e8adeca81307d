use async_trait::async_trait;
use pagerform_api::{ApiError, PagerDutyApi};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ProviderError;

/// Local state of one managed object for the duration of a single call.
///
/// The ID is only set after a successful create or read, and is cleared once
/// the object is known not to exist remotely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData<A> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    /// Typed attributes of the resource.
    #[serde(flatten)]
    pub attrs: A,
}

impl<A> ResourceData<A> {
    /// State for an object that does not exist yet.
    pub fn new(attrs: A) -> Self {
        Self { id: None, attrs }
    }

    /// State for an existing object.
    pub fn with_id(id: impl Into<String>, attrs: A) -> Self {
        Self {
            id: Some(id.into()),
            attrs,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// The ID, or an error for operations that need an existing object.
    pub(crate) fn require_id(&self) -> Result<String, ProviderError> {
        self.id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::invalid_id("", "operation requires an existing resource"))
    }
}

/// Turn a 404 into "gone": clear the ID and report success.
pub(crate) fn handle_not_found<A>(
    err: ApiError,
    data: &mut ResourceData<A>,
) -> Result<(), ProviderError> {
    if err.is_not_found() {
        warn!(
            id = data.id().unwrap_or_default(),
            "resource not found remotely, removing from state"
        );
        data.clear_id();
        Ok(())
    } else {
        Err(err.into())
    }
}

/// Create/read/update/delete reconciliation for one `PagerDuty` object type.
///
/// Handlers are stateless; every call operates only on the passed
/// [`ResourceData`] and the shared client.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Typed attributes of this resource.
    type Attrs: Default + Serialize + DeserializeOwned + Send + Sync;

    /// Name used in logs and the CLI, e.g. `"pagerduty_user"`.
    fn type_name(&self) -> &'static str;

    /// Reject invalid attributes before any request is made.
    fn validate(&self, _attrs: &Self::Attrs) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn create(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<Self::Attrs>,
    ) -> Result<(), ProviderError>;

    /// Refresh attributes. A missing object clears the ID without error.
    async fn read(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<Self::Attrs>,
    ) -> Result<(), ProviderError>;

    async fn update(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<Self::Attrs>,
    ) -> Result<(), ProviderError>;

    /// Delete the object and clear the ID. A missing object is not an error.
    async fn delete(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<Self::Attrs>,
    ) -> Result<(), ProviderError>;

    /// Adopt an existing object by ID.
    async fn import(
        &self,
        api: &dyn PagerDutyApi,
        id: &str,
    ) -> Result<ResourceData<Self::Attrs>, ProviderError> {
        let mut data = ResourceData::with_id(id, Self::Attrs::default());
        self.read(api, &mut data).await?;

        if data.id().is_none() {
            return Err(ProviderError::Import(format!(
                "cannot import non-existent remote object {id} ({})",
                self.type_name()
            )));
        }
        Ok(data)
    }
}
