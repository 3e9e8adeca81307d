use async_trait::async_trait;
use pagerform_api::PagerDutyApi;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::ProviderError;
use crate::resource::{Resource, ResourceData, handle_not_found};
use crate::retry::RetryPolicy;
use crate::validation::validate_value;

/// Roles a user can hold on a team.
pub const TEAM_ROLES: [&str; 3] = ["observer", "responder", "manager"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMembershipAttrs {
    pub user_id: String,
    pub team_id: String,
    pub role: String,
}

impl Default for TeamMembershipAttrs {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            team_id: String::new(),
            role: "manager".to_owned(),
        }
    }
}

/// Split a `user_id:team_id` membership ID.
pub fn parse_membership_id(id: &str) -> Result<(&str, &str), ProviderError> {
    match id.split_once(':') {
        Some((user, team)) if !user.is_empty() && !team.is_empty() && !team.contains(':') => {
            Ok((user, team))
        }
        _ => Err(ProviderError::invalid_id(id, "expected user_id:team_id")),
    }
}

/// `pagerduty_team_membership`.
///
/// Adding a user to a team right after either was created regularly fails
/// with HTTP 500 while `PagerDuty` catches up, so create and update go
/// through a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct TeamMembershipResource {
    retry: RetryPolicy,
}

impl TeamMembershipResource {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    async fn add_with_retry(
        &self,
        api: &dyn PagerDutyApi,
        attrs: &TeamMembershipAttrs,
    ) -> Result<(), ProviderError> {
        let operation = format!("add user {} to team {}", attrs.user_id, attrs.team_id);
        self.retry
            .run(&operation, move || {
                api.add_user_to_team(&attrs.team_id, &attrs.user_id, &attrs.role)
            })
            .await
    }
}

#[async_trait]
impl Resource for TeamMembershipResource {
    type Attrs = TeamMembershipAttrs;

    fn type_name(&self) -> &'static str {
        "pagerduty_team_membership"
    }

    fn validate(&self, attrs: &TeamMembershipAttrs) -> Result<(), ProviderError> {
        if attrs.user_id.is_empty() || attrs.team_id.is_empty() {
            return Err(ProviderError::Validation(
                "user_id and team_id are required".into(),
            ));
        }
        validate_value(&attrs.role, "role", &TEAM_ROLES)
    }

    #[instrument(skip_all, fields(user_id = %data.attrs.user_id, team_id = %data.attrs.team_id))]
    async fn create(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<TeamMembershipAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        debug!(role = %data.attrs.role, "adding user to team");

        self.add_with_retry(api, &data.attrs).await?;
        data.set_id(format!("{}:{}", data.attrs.user_id, data.attrs.team_id));

        self.read(api, data).await
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn read(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<TeamMembershipAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        let (user_id, team_id) = parse_membership_id(&id)?;
        debug!("reading team membership");

        let members = match api.list_members(team_id).await {
            Ok(members) => members,
            Err(e) => return handle_not_found(e, data),
        };

        if let Some(member) = members.into_iter().find(|m| m.user.id == user_id) {
            data.attrs.user_id = user_id.to_owned();
            data.attrs.team_id = team_id.to_owned();
            data.attrs.role = member.role;
            return Ok(());
        }

        warn!(user_id, team_id, "user is not a member of the team, removing from state");
        data.clear_id();
        Ok(())
    }

    /// Re-adding an existing member changes its role.
    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn update(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<TeamMembershipAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        debug!(role = %data.attrs.role, "updating team membership");

        match self.add_with_retry(api, &data.attrs).await {
            Ok(()) => {}
            Err(ProviderError::Api(e)) => return handle_not_found(e, data),
            Err(e) => return Err(e),
        }
        data.set_id(format!("{}:{}", data.attrs.user_id, data.attrs.team_id));
        Ok(())
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn delete(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<TeamMembershipAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        let (user_id, team_id) = parse_membership_id(&id)?;
        debug!("removing user from team");

        if let Err(e) = api.remove_user_from_team(team_id, user_id).await {
            return handle_not_found(e, data);
        }
        data.clear_id();
        Ok(())
    }
}
