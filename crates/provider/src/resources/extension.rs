use std::collections::BTreeSet;

use async_trait::async_trait;
use pagerform_api::{ApiObject, Extension, PagerDutyApi};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::ProviderError;
use crate::expand::{expand_api_objects, flatten_api_objects};
use crate::resource::{Resource, ResourceData, handle_not_found};
use crate::validation::{suppress_json_diff, validate_json_string};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionAttrs {
    /// Computed from the schema when unset.
    pub name: Option<String>,
    pub endpoint_url: Option<String>,
    /// Extension schema ID. Changing it requires a new extension.
    pub extension_schema: String,
    /// Service IDs. Changing them requires a new extension.
    pub extension_objects: BTreeSet<String>,
    /// Schema-specific settings as a JSON document.
    pub config: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub html_url: Option<String>,
    pub summary: Option<String>,
}

fn build_extension(attrs: &ExtensionAttrs) -> Result<Extension, ProviderError> {
    let config: Option<serde_json::Value> = attrs
        .config
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| ProviderError::Validation(format!("config contains an invalid JSON: {e}")))?;

    Ok(Extension {
        kind: "extension".to_owned(),
        name: attrs.name.clone().unwrap_or_default(),
        endpoint_url: attrs.endpoint_url.clone().filter(|u| !u.is_empty()),
        extension_schema: ApiObject::reference(
            &attrs.extension_schema,
            "extension_schema_reference",
        ),
        extension_objects: expand_api_objects("service_reference", &attrs.extension_objects),
        config,
        ..Extension::default()
    })
}

/// `pagerduty_extension`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionResource;

#[async_trait]
impl Resource for ExtensionResource {
    type Attrs = ExtensionAttrs;

    fn type_name(&self) -> &'static str {
        "pagerduty_extension"
    }

    fn validate(&self, attrs: &ExtensionAttrs) -> Result<(), ProviderError> {
        if attrs.extension_schema.is_empty() {
            return Err(ProviderError::Validation(
                "extension_schema is required".into(),
            ));
        }
        if attrs.extension_objects.is_empty() {
            return Err(ProviderError::Validation(
                "extension_objects requires at least one service".into(),
            ));
        }
        if let Some(config) = &attrs.config {
            validate_json_string(config, "config")?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(schema = %data.attrs.extension_schema))]
    async fn create(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<ExtensionAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        info!(name = data.attrs.name.as_deref(), "creating PagerDuty extension");

        let extension = api.create_extension(&build_extension(&data.attrs)?).await?;
        data.set_id(extension.id);

        self.read(api, data).await
    }

    /// A configured `config` that is semantically equal to the remote one is
    /// kept verbatim.
    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn read(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<ExtensionAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("reading PagerDuty extension");

        let extension = match api.get_extension(&id).await {
            Ok(extension) => extension,
            Err(e) => return handle_not_found(e, data),
        };

        let attrs = &mut data.attrs;
        attrs.summary = extension.summary;
        attrs.name = Some(extension.name);
        attrs.endpoint_url = extension.endpoint_url;
        attrs.html_url = extension.html_url;
        attrs.kind = Some(extension.kind);
        attrs.extension_schema = extension.extension_schema.id;
        attrs.extension_objects = flatten_api_objects(&extension.extension_objects)
            .into_iter()
            .collect();

        let remote = match extension.config.as_ref().map(serde_json::to_string).transpose() {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %e, "error setting extension config");
                None
            }
        };
        let unchanged = matches!(
            (&attrs.config, &remote),
            (Some(local), Some(remote)) if suppress_json_diff(local, remote)
        );
        if !unchanged {
            attrs.config = remote;
        }

        Ok(())
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn update(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<ExtensionAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        let id = data.require_id()?;
        info!("updating PagerDuty extension");

        if let Err(e) = api
            .update_extension(&id, &build_extension(&data.attrs)?)
            .await
        {
            return handle_not_found(e, data);
        }

        self.read(api, data).await
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn delete(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<ExtensionAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("deleting PagerDuty extension");

        if let Err(e) = api.delete_extension(&id).await {
            return handle_not_found(e, data);
        }
        data.clear_id();
        Ok(())
    }

    /// Seeds the schema, endpoint and first service from the remote object,
    /// then reads the rest.
    async fn import(
        &self,
        api: &dyn PagerDutyApi,
        id: &str,
    ) -> Result<ResourceData<ExtensionAttrs>, ProviderError> {
        let import_error = || {
            ProviderError::Import(
                "error importing pagerduty_extension. Expecting an importation ID for extension"
                    .into(),
            )
        };

        let extension = api.get_extension(id).await.map_err(|_| import_error())?;
        let first = extension
            .extension_objects
            .first()
            .ok_or_else(import_error)?;

        let mut data = ResourceData::with_id(
            id,
            ExtensionAttrs {
                endpoint_url: extension.endpoint_url.clone(),
                extension_objects: BTreeSet::from([first.id.clone()]),
                extension_schema: extension.extension_schema.id.clone(),
                ..ExtensionAttrs::default()
            },
        );
        self.read(api, &mut data).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use pagerform_api::MockPagerDuty;

    use super::*;

    fn attrs(service_id: &str) -> ExtensionAttrs {
        ExtensionAttrs {
            name: Some("webhook".into()),
            endpoint_url: Some("https://example.com/receive".into()),
            extension_schema: "PJFWPEP".into(),
            extension_objects: BTreeSet::from([service_id.to_owned()]),
            config: Some(r#"{"restrict": "any", "notify_types": {"resolve": true}}"#.into()),
            ..ExtensionAttrs::default()
        }
    }

    #[tokio::test]
    async fn create_sends_typed_references() {
        let mock = MockPagerDuty::new();
        let service = mock.insert_service("API");
        let mut data = ResourceData::new(attrs(&service));

        ExtensionResource.create(&mock, &mut data).await.unwrap();

        let stored = mock.get_extension(data.id().unwrap()).await.unwrap();
        assert_eq!(stored.extension_schema.kind, "extension_schema_reference");
        assert_eq!(stored.extension_objects[0].kind, "service_reference");
        assert_eq!(data.attrs.kind.as_deref(), Some("extension"));
        assert!(data.attrs.html_url.is_some());
    }

    #[tokio::test]
    async fn read_keeps_semantically_equal_config() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs("PS1"));
        let configured = data.attrs.config.clone();

        ExtensionResource.create(&mock, &mut data).await.unwrap();

        assert_eq!(data.attrs.config, configured);
    }

    #[tokio::test]
    async fn read_replaces_drifted_config() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs("PS1"));
        ExtensionResource.create(&mock, &mut data).await.unwrap();

        data.attrs.config = Some(r#"{"restrict": "high"}"#.into());
        ExtensionResource.read(&mock, &mut data).await.unwrap();

        let config: serde_json::Value =
            serde_json::from_str(data.attrs.config.as_deref().unwrap()).unwrap();
        assert_eq!(config["restrict"], "any");
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_locally() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(ExtensionAttrs {
            config: Some("{not json".into()),
            ..attrs("PS1")
        });

        let err = ExtensionResource.create(&mock, &mut data).await.unwrap_err();

        assert!(matches!(err, ProviderError::Validation(_)));
        assert_eq!(mock.calls("create_extension"), 0);
    }

    #[tokio::test]
    async fn update_reads_back() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs("PS1"));
        ExtensionResource.create(&mock, &mut data).await.unwrap();

        data.attrs.name = Some("renamed".into());
        ExtensionResource.update(&mock, &mut data).await.unwrap();

        assert_eq!(data.attrs.summary.as_deref(), Some("renamed"));
        assert_eq!(mock.calls("get_extension"), 2);
    }

    #[tokio::test]
    async fn delete_treats_missing_as_gone() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::with_id("PGONE", attrs("PS1"));

        ExtensionResource.delete(&mock, &mut data).await.unwrap();

        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn import_copies_first_object_and_schema() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs("PS1"));
        ExtensionResource.create(&mock, &mut data).await.unwrap();
        let id = data.id().unwrap().to_owned();

        let imported = ExtensionResource.import(&mock, &id).await.unwrap();

        assert_eq!(imported.id(), Some(id.as_str()));
        assert_eq!(imported.attrs.extension_schema, "PJFWPEP");
        assert_eq!(imported.attrs.extension_objects, BTreeSet::from(["PS1".to_owned()]));
        assert_eq!(
            imported.attrs.endpoint_url.as_deref(),
            Some("https://example.com/receive")
        );
    }

    #[tokio::test]
    async fn import_of_unknown_id_explains_expected_input() {
        let mock = MockPagerDuty::new();
        let err = ExtensionResource.import(&mock, "PNOPE").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "error importing pagerduty_extension. Expecting an importation ID for extension"
        );
    }
}
