use async_trait::async_trait;
use pagerform_api::{EscalationPolicy, PagerDutyApi};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ProviderError;
use crate::expand::{
    RuleAttrs, expand_api_reference, expand_escalation_rules, flatten_api_reference,
    flatten_escalation_rules,
};
use crate::resource::{Resource, ResourceData, handle_not_found};
use crate::resources::MANAGED_BY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationPolicyAttrs {
    pub name: String,
    pub description: String,
    pub num_loops: u32,
    /// Team IDs, sent as `team_reference`s.
    pub teams: Vec<String>,
    pub rules: Vec<RuleAttrs>,
}

impl Default for EscalationPolicyAttrs {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: MANAGED_BY.to_owned(),
            num_loops: 0,
            teams: Vec::new(),
            rules: Vec::new(),
        }
    }
}

fn build_policy(attrs: &EscalationPolicyAttrs) -> EscalationPolicy {
    EscalationPolicy {
        kind: "escalation_policy".to_owned(),
        name: attrs.name.clone(),
        description: Some(attrs.description.clone()).filter(|d| !d.is_empty()),
        num_loops: attrs.num_loops,
        escalation_rules: expand_escalation_rules(&attrs.rules),
        teams: expand_api_reference(&attrs.teams, "team_reference"),
        ..EscalationPolicy::default()
    }
}

/// `pagerduty_escalation_policy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscalationPolicyResource;

#[async_trait]
impl Resource for EscalationPolicyResource {
    type Attrs = EscalationPolicyAttrs;

    fn type_name(&self) -> &'static str {
        "pagerduty_escalation_policy"
    }

    fn validate(&self, attrs: &EscalationPolicyAttrs) -> Result<(), ProviderError> {
        if attrs.name.is_empty() {
            return Err(ProviderError::Validation("name is required".into()));
        }
        if attrs.rules.is_empty() {
            return Err(ProviderError::Validation(
                "at least one rule is required".into(),
            ));
        }
        if let Some(i) = attrs.rules.iter().position(|r| r.targets.is_empty()) {
            return Err(ProviderError::Validation(format!(
                "rule {i} requires at least one target"
            )));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(name = %data.attrs.name))]
    async fn create(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<EscalationPolicyAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        info!("creating PagerDuty escalation policy");

        let policy = api.create_escalation_policy(&build_policy(&data.attrs)).await?;
        data.set_id(policy.id);

        self.read(api, data).await
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn read(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<EscalationPolicyAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("reading PagerDuty escalation policy");

        let policy = match api.get_escalation_policy(&id).await {
            Ok(policy) => policy,
            Err(e) => return handle_not_found(e, data),
        };

        data.attrs = EscalationPolicyAttrs {
            name: policy.name,
            description: policy.description.unwrap_or_default(),
            num_loops: policy.num_loops,
            teams: flatten_api_reference(&policy.teams),
            rules: flatten_escalation_rules(&policy.escalation_rules),
        };
        Ok(())
    }

    /// Does not read back; rule IDs assigned by the update appear on the next read.
    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn update(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<EscalationPolicyAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        let id = data.require_id()?;
        info!("updating PagerDuty escalation policy");

        if let Err(e) = api
            .update_escalation_policy(&id, &build_policy(&data.attrs))
            .await
        {
            return handle_not_found(e, data);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn delete(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<EscalationPolicyAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("deleting PagerDuty escalation policy");

        if let Err(e) = api.delete_escalation_policy(&id).await {
            return handle_not_found(e, data);
        }
        data.clear_id();
        Ok(())
    }
}
