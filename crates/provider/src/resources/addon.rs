use async_trait::async_trait;
use pagerform_api::{Addon, PagerDutyApi};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ProviderError;
use crate::resource::{Resource, ResourceData, handle_not_found};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddonAttrs {
    pub name: String,
    /// URL of the page embedded in the web UI.
    pub src: String,
    pub html_url: Option<String>,
}

/// `pagerduty_addon`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddonResource;

impl AddonResource {
    fn build(attrs: &AddonAttrs) -> Addon {
        Addon {
            kind: "full_page_addon".to_owned(),
            name: attrs.name.clone(),
            src: attrs.src.clone(),
            ..Addon::default()
        }
    }
}

#[async_trait]
impl Resource for AddonResource {
    type Attrs = AddonAttrs;

    fn type_name(&self) -> &'static str {
        "pagerduty_addon"
    }

    fn validate(&self, attrs: &AddonAttrs) -> Result<(), ProviderError> {
        if attrs.name.is_empty() || attrs.src.is_empty() {
            return Err(ProviderError::Validation("name and src are required".into()));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(name = %data.attrs.name))]
    async fn create(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<AddonAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        info!("creating PagerDuty add-on");

        let addon = api.create_addon(&Self::build(&data.attrs)).await?;
        data.set_id(addon.id);

        self.read(api, data).await
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn read(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<AddonAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("reading PagerDuty add-on");

        match api.get_addon(&id).await {
            Ok(addon) => {
                data.attrs = AddonAttrs {
                    name: addon.name,
                    src: addon.src,
                    html_url: addon.html_url,
                };
                Ok(())
            }
            Err(e) => handle_not_found(e, data),
        }
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn update(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<AddonAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        let id = data.require_id()?;
        info!("updating PagerDuty add-on");

        if let Err(e) = api.update_addon(&id, &Self::build(&data.attrs)).await {
            return handle_not_found(e, data);
        }

        self.read(api, data).await
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn delete(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<AddonAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("deleting PagerDuty add-on");

        if let Err(e) = api.delete_addon(&id).await {
            return handle_not_found(e, data);
        }
        data.clear_id();
        Ok(())
    }
}
