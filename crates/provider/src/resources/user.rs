use std::collections::BTreeSet;

use async_trait::async_trait;
use pagerform_api::{PagerDutyApi, User};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ProviderError;
use crate::expand::{expand_string_list, flatten_teams};
use crate::resource::{Resource, ResourceData, handle_not_found};
use crate::resources::MANAGED_BY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAttrs {
    pub name: String,
    pub email: String,
    /// Computed when unset.
    pub color: Option<String>,
    /// Computed when unset.
    pub time_zone: Option<String>,
    pub role: String,
    pub job_title: Option<String>,
    pub description: String,
    /// Deprecated: prefer [`TeamMembershipResource`](crate::TeamMembershipResource).
    /// `None` leaves memberships unmanaged.
    pub teams: Option<BTreeSet<String>>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub invitation_sent: bool,
}

impl Default for UserAttrs {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            color: None,
            time_zone: None,
            role: "user".to_owned(),
            job_title: None,
            description: MANAGED_BY.to_owned(),
            teams: None,
            avatar_url: None,
            html_url: None,
            invitation_sent: false,
        }
    }
}

fn build_user(data: &ResourceData<UserAttrs>) -> User {
    let attrs = &data.attrs;
    User {
        id: data.id().unwrap_or_default().to_owned(),
        kind: "user".to_owned(),
        name: attrs.name.clone(),
        email: attrs.email.clone(),
        color: attrs.color.clone().filter(|c| !c.is_empty()),
        time_zone: attrs.time_zone.clone().filter(|t| !t.is_empty()),
        role: Some(attrs.role.clone()).filter(|r| !r.is_empty()),
        job_title: attrs.job_title.clone().filter(|j| !j.is_empty()),
        description: Some(attrs.description.clone()).filter(|d| !d.is_empty()),
        ..User::default()
    }
}

/// `pagerduty_user`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResource;

impl UserResource {
    /// Bring the user's team memberships in line with `desired`.
    ///
    /// Teams that no longer exist are skipped when removing.
    async fn reconcile_teams(
        api: &dyn PagerDutyApi,
        user_id: &str,
        desired: &BTreeSet<String>,
    ) -> Result<(), ProviderError> {
        let desired: BTreeSet<String> = expand_string_list(desired).into_iter().collect();
        let current: BTreeSet<String> = flatten_teams(&api.get_user(user_id).await?.teams)
            .into_iter()
            .collect();

        for team in current.difference(&desired) {
            if api.get_team(team).await.is_err() {
                info!(
                    team = %team,
                    user_id,
                    "team not found, removing dangling team reference"
                );
                continue;
            }
            info!(team = %team, user_id, "removing user from team");
            api.remove_user_from_team(team, user_id).await?;
        }

        for team in desired.difference(&current) {
            info!(team = %team, user_id, "adding user to team");
            api.add_user_to_team(team, user_id, "manager").await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Resource for UserResource {
    type Attrs = UserAttrs;

    fn type_name(&self) -> &'static str {
        "pagerduty_user"
    }

    fn validate(&self, attrs: &UserAttrs) -> Result<(), ProviderError> {
        if attrs.name.is_empty() {
            return Err(ProviderError::Validation("name is required".into()));
        }
        if attrs.email.is_empty() {
            return Err(ProviderError::Validation("email is required".into()));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(name = %data.attrs.name))]
    async fn create(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<UserAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        info!("creating PagerDuty user");

        let user = api.create_user(&build_user(data)).await?;
        data.set_id(user.id);

        self.update(api, data).await
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn read(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<UserAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("reading PagerDuty user");

        let user = match api.get_user(&id).await {
            Ok(user) => user,
            Err(e) => return handle_not_found(e, data),
        };

        let attrs = &mut data.attrs;
        attrs.name = user.name;
        attrs.email = user.email;
        attrs.time_zone = user.time_zone;
        attrs.html_url = user.html_url;
        attrs.color = user.color;
        attrs.role = user.role.unwrap_or_default();
        attrs.avatar_url = user.avatar_url;
        attrs.description = user.description.unwrap_or_default();
        attrs.job_title = user.job_title;
        attrs.invitation_sent = user.invitation_sent;
        attrs.teams = Some(flatten_teams(&user.teams).into_iter().collect());

        Ok(())
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn update(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<UserAttrs>,
    ) -> Result<(), ProviderError> {
        self.validate(&data.attrs)?;
        let id = data.require_id()?;
        info!("updating PagerDuty user");

        if let Err(e) = api.update_user(&id, &build_user(data)).await {
            return handle_not_found(e, data);
        }

        if let Some(teams) = &data.attrs.teams {
            Self::reconcile_teams(api, &id, teams).await?;
        }

        self.read(api, data).await
    }

    #[instrument(skip_all, fields(id = data.id().unwrap_or_default()))]
    async fn delete(
        &self,
        api: &dyn PagerDutyApi,
        data: &mut ResourceData<UserAttrs>,
    ) -> Result<(), ProviderError> {
        let id = data.require_id()?;
        info!("deleting PagerDuty user");

        if let Err(e) = api.delete_user(&id).await {
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

    fn attrs(name: &str, email: &str) -> UserAttrs {
        UserAttrs {
            name: name.into(),
            email: email.into(),
            ..UserAttrs::default()
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_reads_back() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs("Earline", "earline@foo.com"));

        UserResource.create(&mock, &mut data).await.unwrap();

        assert!(data.id().is_some());
        assert_eq!(data.attrs.role, "user");
        assert_eq!(data.attrs.description, "Managed by Terraform");
        assert!(data.attrs.invitation_sent);
        assert!(data.attrs.avatar_url.is_some());
        assert_eq!(mock.calls("create_user"), 1);
        assert_eq!(mock.calls("update_user"), 1);
    }

    #[tokio::test]
    async fn missing_email_is_rejected_locally() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs("Earline", ""));

        let err = UserResource.create(&mock, &mut data).await.unwrap_err();

        assert!(matches!(err, ProviderError::Validation(_)));
        assert_eq!(mock.calls("create_user"), 0);
    }

    #[tokio::test]
    async fn update_reconciles_teams() {
        let mock = MockPagerDuty::new();
        let keep = mock.insert_team("keep", None);
        let stale = mock.insert_team("stale", None);
        let add = mock.insert_team("add", None);

        let mut data = ResourceData::new(UserAttrs {
            teams: Some([keep.clone(), stale.clone()].into()),
            ..attrs("Earline", "earline@foo.com")
        });
        UserResource.create(&mock, &mut data).await.unwrap();
        assert_eq!(data.attrs.teams, Some([keep.clone(), stale.clone()].into()));

        data.attrs.teams = Some([keep.clone(), add.clone()].into());
        UserResource.update(&mock, &mut data).await.unwrap();

        assert_eq!(data.attrs.teams, Some([keep, add].into()));
        assert!(mock.members(&stale).is_empty());
    }

    #[tokio::test]
    async fn blank_team_ids_are_ignored() {
        let mock = MockPagerDuty::new();
        let team = mock.insert_team("Engineering", None);
        let mut data = ResourceData::new(UserAttrs {
            teams: Some([String::new(), team.clone()].into()),
            ..attrs("Earline", "earline@foo.com")
        });

        UserResource.create(&mock, &mut data).await.unwrap();

        assert_eq!(mock.calls("add_user_to_team"), 1);
        assert_eq!(data.attrs.teams, Some([team].into()));
    }

    #[tokio::test]
    async fn removed_teams_that_vanished_are_skipped() {
        let mock = MockPagerDuty::new();
        let gone = mock.insert_team("gone", None);
        let user = mock.insert_user("Earline", "earline@foo.com");
        mock.add_user_to_team(&gone, &user, "manager").await.unwrap();
        mock.fail_always("get_team", 404);

        let mut data = ResourceData::with_id(
            user,
            UserAttrs {
                teams: Some(BTreeSet::new()),
                ..attrs("Earline", "earline@foo.com")
            },
        );
        UserResource.update(&mock, &mut data).await.unwrap();

        assert_eq!(mock.calls("remove_user_from_team"), 0);
    }

    #[tokio::test]
    async fn delete_then_read_clears_id() {
        let mock = MockPagerDuty::new();
        let mut data = ResourceData::new(attrs("Earline", "earline@foo.com"));
        UserResource.create(&mock, &mut data).await.unwrap();
        let id = data.id().unwrap().to_owned();

        UserResource.delete(&mock, &mut data).await.unwrap();
        assert_eq!(data.id(), None);

        let mut stale = ResourceData::with_id(id, UserAttrs::default());
        UserResource.read(&mock, &mut stale).await.unwrap();
        assert_eq!(stale.id(), None);
    }

    #[tokio::test]
    async fn import_of_unknown_user_fails() {
        let mock = MockPagerDuty::new();
        let err = UserResource.import(&mock, "PNOPE").await.unwrap_err();
        assert!(matches!(err, ProviderError::Import(_)));
    }
}
