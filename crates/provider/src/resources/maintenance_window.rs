use std::collections::BTreeSet;

use async_trait::async_trait;
use pagerform_api::{MaintenanceWindow, PagerDutyApi};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ProviderError;
use crate::expand::{expand_api_objects, flatten_api_objects};
use crate::resource::{Resource, ResourceData, handle_not_found};
use crate::resources::MANAGED_BY;
use crate::validation::{suppress_rfc3339_diff, time_to_utc, validate_rfc3339};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceWindowAttrs {
    /// RFC3339 timestamp.
    pub start_time: String,
    /// RFC3339 timestamp.
    pub end_time: String,
    /// Service IDs covered by the window.
    pub services: BTreeSet<String>,
    pub description: String,
}

impl Default for MaintenanceWindowAttrs {
    fn default() -> Self {
        Self {
            start_time: String::new(),
            end_time: String::new(),
            services: BTreeSet::new(),
            description: MANAGED_BY.to_owned(),
        }
    }
}

/// Times are sent in UTC.
fn build_window(
    data: &ResourceData<MaintenanceWindowAttrs>,
) -> Result<MaintenanceWindow, ProviderError> {
    Ok(MaintenanceWindow {
        id: data.id().unwrap_or_default().to_owned(),
        kind: "maintenance_window".to_owned(),
        start_time: time_to_utc(&data.attrs.start_time)?,
        end_time: time_to_utc(&data.attrs.end_time)?,
        description: Some(data.attrs.description.clone()).filter(|d| !d.is_empty()),
        services: expand_api_objects("service_reference", &data.attrs.services),
    })
}

/// Replace `local` with `remote` unless both denote the same instant.
fn merge_time(key: &str, local: &mut String, remote: String) {
    if local.is_empty() || !suppress_rfc3339_diff(key, local, &remote) {
        *local = remote;
    }
}

/// `pagerduty_maintenance_window`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaintenanceWindowResource;

#[async_trait]
impl Resource for MaintenanceWindowResource {
    type Attrs = MaintenanceWindowAttrs;

    fn type_name(&self) -> &'static str {
        "pagerduty_maintenance_window"
    }

    fn validate(&self, attrs: &MaintenanceWindowAttrs) -> Result<(), ProviderError> {
        validate_rfc3339(&attrs.start_time, "start_time")?;
        validate_rfc3339(&attrs.end_time, "end_time")?;
        if attrs.services.is_empty() {
            return Err(ProviderError::Validation(
                "services requires at least one service".into(),
            ));
        }
        Ok(())
    }

    /// Only records the ID; the window is not read back.
    #[instrument(skip_all)]
    async fn create(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<MaintenanceWindowAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        info!("creating PagerDuty maintenance window");

        let window = api.create_maintenance_window(&build_window(data)?).await?;
        data.set_id(window.id);
        Ok(())
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn read(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<MaintenanceWindowAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("reading PagerDuty maintenance window");

        let window = match api.get_maintenance_window(&id).await {
            Ok(window) => window,
            Err(e) => return handle_not_found(e, data),
        };

        let attrs = &mut data.attrs;
        attrs.description = window.description.unwrap_or_default();
        merge_time("start_time", &mut attrs.start_time, window.start_time);
        merge_time("end_time", &mut attrs.end_time, window.end_time);
        attrs.services = flatten_api_objects(&window.services).into_iter().collect();
        Ok(())
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn update(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<MaintenanceWindowAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        let id = data.require_id()?;
        info!("updating PagerDuty maintenance window");

        if let Err(e) = api.update_maintenance_window(&id, &build_window(data)?).await {
            return handle_not_found(e, data);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn delete(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<MaintenanceWindowAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("deleting PagerDuty maintenance window");

        if let Err(e) = api.delete_maintenance_window(&id).await {
            return handle_not_found(e, data);
        }
        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pagerform_api::MockPagerDuty;

    use super::*;

    fn attrs() -> MaintenanceWindowAttrs {
        MaintenanceWindowAttrs {
            start_time: "2015-11-09T20:00:00-05:00".into(),
            end_time: "2015-11-09T22:00:00-05:00".into(),
            services: BTreeSet::from(["PS1".to_owned()]),
            ..MaintenanceWindowAttrs::default()
        }
    }

    #[tokio::test]
    async fn create_only_sets_id() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs());

        MaintenanceWindowResource.create(&mock, &mut data).await.unwrap();

        assert!(data.id().is_some());
        assert_eq!(mock.calls("get_maintenance_window"), 0);
        let stored = mock
            .get_maintenance_window(data.id().unwrap())
            .await
            .unwrap();
        assert_eq!(stored.description.as_deref(), Some("Managed by Terraform"));
        assert_eq!(stored.start_time, "2015-11-10T01:00:00Z");
        assert_eq!(stored.end_time, "2015-11-10T03:00:00Z");
        assert_eq!(stored.services[0].kind, "service_reference");
    }

    #[tokio::test]
    async fn malformed_times_are_rejected_locally() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(MaintenanceWindowAttrs {
            end_time: "2015-11-09 22:00".into(),
            ..attrs()
        });

        let err = MaintenanceWindowResource
            .create(&mock, &mut data)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("argument: end_time"));
        assert_eq!(mock.calls("create_maintenance_window"), 0);
    }

    #[tokio::test]
    async fn read_keeps_equivalent_timestamps() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs());
        MaintenanceWindowResource.create(&mock, &mut data).await.unwrap();
        let id = data.id().unwrap().to_owned();

        // PagerDuty reports times in the account's time zone.
        let mut remote = mock.get_maintenance_window(&id).await.unwrap();
        remote.start_time = "2015-11-10T01:00:00Z".into();
        remote.end_time = "2015-11-10T04:00:00Z".into();
        mock.update_maintenance_window(&id, &remote).await.unwrap();

        MaintenanceWindowResource.read(&mock, &mut data).await.unwrap();

        assert_eq!(data.attrs.start_time, "2015-11-09T20:00:00-05:00");
        assert_eq!(data.attrs.end_time, "2015-11-10T04:00:00Z");
    }

    #[tokio::test]
    async fn delete_then_read_clears_id() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs());
        MaintenanceWindowResource.create(&mock, &mut data).await.unwrap();
        let id = data.id().unwrap().to_owned();

        MaintenanceWindowResource.delete(&mock, &mut data).await.unwrap();
        let mut stale = ResourceData::with_id(id, attrs());
        MaintenanceWindowResource.read(&mock, &mut stale).await.unwrap();

        assert_eq!(stale.id(), None);
    }
}
