use async_trait::async_trait;
use pagerform_api::{ApiObject, Integration, PagerDutyApi};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ProviderError;
use crate::resource::{Resource, ResourceData, handle_not_found};
use crate::validation::validate_value;

/// Integration types accepted in `type`.
pub const INTEGRATION_TYPES: [&str; 10] = [
    "aws_cloudwatch_inbound_integration",
    "cloudkick_inbound_integration",
    "event_transformer_api_inbound_integration",
    "events_api_v2_inbound_integration",
    "generic_email_inbound_integration",
    "generic_events_api_inbound_integration",
    "keynote_inbound_integration",
    "nagios_inbound_integration",
    "pingdom_inbound_integration",
    "sql_monitor_inbound_integration",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceIntegrationAttrs {
    /// Owning service ID. Changing it requires a new integration.
    pub service: String,
    pub name: Option<String>,
    /// Generic integration type; mutually exclusive with `vendor`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Vendor ID; mutually exclusive with `type`.
    pub vendor: Option<String>,
    pub integration_key: Option<String>,
    pub integration_email: Option<String>,
    pub html_url: Option<String>,
}

/// Split a `service_id.integration_id` import ID.
pub fn parse_integration_import_id(id: &str) -> Result<(&str, &str), ProviderError> {
    match id.split_once('.') {
        Some((service, integration))
            if !service.is_empty() && !integration.is_empty() && !integration.contains('.') =>
        {
            Ok((service, integration))
        }
        _ => Err(ProviderError::invalid_id(
            id,
            "expected service_id.integration_id",
        )),
    }
}

fn build_integration(attrs: &ServiceIntegrationAttrs) -> Integration {
    Integration {
        kind: attrs.kind.clone().unwrap_or_default(),
        name: attrs.name.clone(),
        service: Some(ApiObject::reference(&attrs.service, "service_reference")),
        vendor: attrs
            .vendor
            .as_ref()
            .map(|id| ApiObject::reference(id, "vendor_reference")),
        ..Integration::default()
    }
}

/// `pagerduty_service_integration`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceIntegrationResource;

#[async_trait]
impl Resource for ServiceIntegrationResource {
    type Attrs = ServiceIntegrationAttrs;

    fn type_name(&self) -> &'static str {
        "pagerduty_service_integration"
    }

    fn validate(&self, attrs: &ServiceIntegrationAttrs) -> Result<(), ProviderError> {
        if attrs.service.is_empty() {
            return Err(ProviderError::Validation("service is required".into()));
        }
        match (&attrs.kind, &attrs.vendor) {
            (Some(_), Some(_)) => Err(ProviderError::Validation(
                "\"type\": conflicts with vendor".into(),
            )),
            (None, None) => Err(ProviderError::Validation(
                "one of type or vendor is required".into(),
            )),
            (Some(kind), None) => validate_value(kind, "type", &INTEGRATION_TYPES),
            (None, Some(_)) => Ok(()),
        }
    }

    #[instrument(skip_all, fields(service = %data.attrs.service))]
    async fn create(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<ServiceIntegrationAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        info!("creating PagerDuty service integration");

        let integration = api
            .create_integration(&data.attrs.service, &build_integration(&data.attrs))
            .await?;
        data.set_id(integration.id);

        self.read(api, data).await
    }

    #[instrument(skip_all, fields(service = %data.attrs.service, id = data.id().unwrap_or_default()))]
    async fn read(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<ServiceIntegrationAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("reading PagerDuty service integration");

        let integration = match api.get_integration(&data.attrs.service, &id).await {
            Ok(integration) => integration,
            Err(e) => return handle_not_found(e, data),
        };

        let attrs = &mut data.attrs;
        attrs.name = integration.name;
        attrs.vendor = integration.vendor.map(|v| v.id);
        attrs.kind = if attrs.vendor.is_some() {
            None
        } else {
            Some(integration.kind)
        };
        attrs.integration_key = integration.integration_key;
        attrs.integration_email = integration.integration_email;
        attrs.html_url = integration.html_url;
        Ok(())
    }

    #[instrument(skip_all, fields(service = %data.attrs.service, id = data.id().unwrap_or_default()))]
    async fn update(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<ServiceIntegrationAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        let id = data.require_id()?;
        info!("updating PagerDuty service integration");

        if let Err(e) = api
            .update_integration(&data.attrs.service, &id, &build_integration(&data.attrs))
            .await
        {
            return handle_not_found(e, data);
        }

        self.read(api, data).await
    }

    #[instrument(skip_all, fields(service = %data.attrs.service, id = data.id().unwrap_or_default()))]
    async fn delete(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<ServiceIntegrationAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("deleting PagerDuty service integration");

        if let Err(e) = api.delete_integration(&data.attrs.service, &id).await {
            return handle_not_found(e, data);
        }
        data.clear_id();
        Ok(())
    }

    /// Expects `service_id.integration_id`.
    async fn import(
        &self,
        api: &dyn PagerDutyApi,
        id: &str,
    ) -> Result<ResourceData<ServiceIntegrationAttrs>, ProviderError> {
        let (service, integration) = parse_integration_import_id(id)?;
        let mut data = ResourceData::with_id(
            integration,
            ServiceIntegrationAttrs {
                service: service.to_owned(),
                ..ServiceIntegrationAttrs::default()
            },
        );
        self.read(api, &mut data).await?;

        if data.id().is_none() {
            return Err(ProviderError::Import(format!(
                "cannot import non-existent remote object {id} (pagerduty_service_integration)"
            )));
        }
        Ok(data)
    }
}
