//! In-memory [`PagerDutyApi`] implementation for tests.
//!
//! [`MockPagerDuty`] keeps every object in process memory, hands out
//! sequential IDs and answers missing objects with HTTP 404, the same way the
//! real API does. Individual operations can be scripted to fail with a given
//! HTTP status so retry and error-handling paths can be exercised without a
//! network.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::api::PagerDutyApi;
use crate::error::ApiError;
use crate::types::{
    Addon, ApiObject, EscalationPolicy, Extension, Integration, MaintenanceWindow, Member,
    Service, Team, User, Vendor,
};

#[derive(Default)]
struct State {
    next_id: u32,
    abilities: Vec<String>,
    users: BTreeMap<String, User>,
    teams: BTreeMap<String, Team>,
    members: BTreeMap<String, Vec<Member>>,
    escalation_policies: BTreeMap<String, EscalationPolicy>,
    extensions: BTreeMap<String, Extension>,
    maintenance_windows: BTreeMap<String, MaintenanceWindow>,
    addons: BTreeMap<String, Addon>,
    vendors: Vec<Vendor>,
    services: Vec<Service>,
    integrations: BTreeMap<(String, String), Integration>,
    scripted_failures: HashMap<String, VecDeque<u16>>,
    persistent_failures: HashMap<String, u16>,
    calls: HashMap<String, usize>,
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("P{:06}", self.next_id)
    }
}

/// In-memory stand-in for the `PagerDuty` REST API.
pub struct MockPagerDuty {
    state: Mutex<State>,
}

impl Default for MockPagerDuty {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(kind: &str, id: &str) -> ApiError {
    ApiError::api(404, format!("{kind} {id} Not Found"))
}

fn matches_query(haystack: &str, query: &str) -> bool {
    query.is_empty() || haystack.to_lowercase().contains(&query.to_lowercase())
}

impl MockPagerDuty {
    /// Create an empty mock whose account has the `teams` ability.
    pub fn new() -> Self {
        let state = State {
            abilities: vec!["teams".to_owned()],
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call to `op` and return the scripted failure for it, if any.
    fn enter(&self, op: &str) -> Result<MutexGuard<'_, State>, ApiError> {
        let mut state = self.lock();
        *state.calls.entry(op.to_owned()).or_default() += 1;

        if let Some(status) = state
            .scripted_failures
            .get_mut(op)
            .and_then(VecDeque::pop_front)
        {
            return Err(ApiError::api(status, format!("scripted failure for {op}")));
        }

        if let Some(status) = state.persistent_failures.get(op) {
            return Err(ApiError::api(*status, format!("scripted failure for {op}")));
        }

        Ok(state)
    }

    /// Make the next `statuses.len()` calls to `op` fail with those statuses, in order.
    pub fn fail_next(&self, op: &str, statuses: impl IntoIterator<Item = u16>) {
        self.lock()
            .scripted_failures
            .entry(op.to_owned())
            .or_default()
            .extend(statuses);
    }

    /// Make every call to `op` fail with `status` until [`clear_failures`](Self::clear_failures).
    pub fn fail_always(&self, op: &str, status: u16) {
        self.lock().persistent_failures.insert(op.to_owned(), status);
    }

    /// Remove all scripted failures.
    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.scripted_failures.clear();
        state.persistent_failures.clear();
    }

    /// Number of times `op` (a [`PagerDutyApi`] method name) was called.
    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    /// Seed a user and return its ID.
    pub fn insert_user(&self, name: &str, email: &str) -> String {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.users.insert(
            id.clone(),
            User {
                id: id.clone(),
                kind: "user".to_owned(),
                name: name.to_owned(),
                email: email.to_owned(),
                role: Some("user".to_owned()),
                ..User::default()
            },
        );
        id
    }

    /// Seed a team and return its ID.
    pub fn insert_team(&self, name: &str, description: Option<&str>) -> String {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.teams.insert(
            id.clone(),
            Team {
                id: id.clone(),
                name: name.to_owned(),
                description: description.map(str::to_owned),
                html_url: None,
            },
        );
        id
    }

    /// Delete a team behind the caller's back (simulates out-of-band drift).
    pub fn remove_team(&self, id: &str) {
        let mut state = self.lock();
        state.teams.remove(id);
        state.members.remove(id);
    }

    /// Seed a vendor and return its ID.
    pub fn insert_vendor(&self, name: &str, generic_service_type: &str) -> String {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.vendors.push(Vendor {
            id: id.clone(),
            name: name.to_owned(),
            generic_service_type: Some(generic_service_type.to_owned()),
            description: None,
        });
        id
    }

    /// Seed a service and return its ID.
    pub fn insert_service(&self, name: &str) -> String {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.services.push(Service {
            id: id.clone(),
            name: name.to_owned(),
            description: None,
            html_url: None,
        });
        id
    }

    /// Seed an escalation policy with no rules and return its ID.
    pub fn insert_escalation_policy(&self, name: &str) -> String {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.escalation_policies.insert(
            id.clone(),
            EscalationPolicy {
                id: id.clone(),
                kind: "escalation_policy".to_owned(),
                name: name.to_owned(),
                ..EscalationPolicy::default()
            },
        );
        id
    }

    /// Seed an add-on and return its ID.
    pub fn insert_addon(&self, name: &str, src: &str) -> String {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.addons.insert(
            id.clone(),
            Addon {
                id: id.clone(),
                kind: "full_page_addon".to_owned(),
                name: name.to_owned(),
                src: src.to_owned(),
                html_url: None,
            },
        );
        id
    }

    /// Members of a team as currently stored.
    pub fn members(&self, team_id: &str) -> Vec<Member> {
        self.lock().members.get(team_id).cloned().unwrap_or_default()
    }

    /// IDs of the add-ons currently stored.
    pub fn addon_ids(&self) -> Vec<String> {
        self.lock().addons.keys().cloned().collect()
    }

    /// Whether an extension with this ID exists.
    pub fn has_extension(&self, id: &str) -> bool {
        self.lock().extensions.contains_key(id)
    }
}

#[async_trait]
impl PagerDutyApi for MockPagerDuty {
    async fn list_abilities(&self) -> Result<Vec<String>, ApiError> {
        let state = self.enter("list_abilities")?;
        Ok(state.abilities.clone())
    }

    async fn list_users(&self, query: &str) -> Result<Vec<User>, ApiError> {
        let state = self.enter("list_users")?;
        Ok(state
            .users
            .values()
            .filter(|u| matches_query(&u.name, query) || matches_query(&u.email, query))
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: &User) -> Result<User, ApiError> {
        let mut state = self.enter("create_user")?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(ApiError::api(
                400,
                "Invalid Input Provided: Email has already been taken.",
            ));
        }
        let id = state.allocate_id();
        let mut created = user.clone();
        created.id.clone_from(&id);
        created.html_url = Some(format!("https://example.pagerduty.com/users/{id}"));
        created.avatar_url = Some(format!("https://secure.gravatar.com/avatar/{id}"));
        created.invitation_sent = true;
        created.teams.clear();
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        let state = self.enter("get_user")?;
        let mut user = state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("User", id))?;
        user.teams = state
            .members
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m.user.id == id))
            .map(|(team_id, _)| ApiObject::reference(team_id.clone(), "team_reference"))
            .collect();
        Ok(user)
    }

    async fn update_user(&self, id: &str, user: &User) -> Result<User, ApiError> {
        let mut state = self.enter("update_user")?;
        let existing = state.users.get_mut(id).ok_or_else(|| not_found("User", id))?;
        existing.name.clone_from(&user.name);
        existing.email.clone_from(&user.email);
        if user.time_zone.is_some() {
            existing.time_zone.clone_from(&user.time_zone);
        }
        if user.color.is_some() {
            existing.color.clone_from(&user.color);
        }
        existing.role.clone_from(&user.role);
        existing.job_title.clone_from(&user.job_title);
        existing.description.clone_from(&user.description);
        Ok(existing.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter("delete_user")?;
        state.users.remove(id).ok_or_else(|| not_found("User", id))?;
        for members in state.members.values_mut() {
            members.retain(|m| m.user.id != id);
        }
        Ok(())
    }

    async fn list_teams(&self, query: &str) -> Result<Vec<Team>, ApiError> {
        let state = self.enter("list_teams")?;
        Ok(state
            .teams
            .values()
            .filter(|t| matches_query(&t.name, query))
            .cloned()
            .collect())
    }

    async fn get_team(&self, id: &str) -> Result<Team, ApiError> {
        let state = self.enter("get_team")?;
        state.teams.get(id).cloned().ok_or_else(|| not_found("Team", id))
    }

    async fn list_members(&self, team_id: &str) -> Result<Vec<Member>, ApiError> {
        let state = self.enter("list_members")?;
        if !state.teams.contains_key(team_id) {
            return Err(not_found("Team", team_id));
        }
        Ok(state.members.get(team_id).cloned().unwrap_or_default())
    }

    async fn add_user_to_team(
        &self,
        team_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.enter("add_user_to_team")?;
        if !state.teams.contains_key(team_id) {
            return Err(not_found("Team", team_id));
        }
        if !state.users.contains_key(user_id) {
            return Err(not_found("User", user_id));
        }
        let members = state.members.entry(team_id.to_owned()).or_default();
        match members.iter_mut().find(|m| m.user.id == user_id) {
            Some(member) => role.clone_into(&mut member.role),
            None => members.push(Member {
                user: ApiObject::reference(user_id, "user_reference"),
                role: role.to_owned(),
            }),
        }
        Ok(())
    }

    async fn remove_user_from_team(&self, team_id: &str, user_id: &str) -> Result<(), ApiError> {
        let mut state = self.enter("remove_user_from_team")?;
        let members = state
            .members
            .get_mut(team_id)
            .ok_or_else(|| not_found("Team", team_id))?;
        let before = members.len();
        members.retain(|m| m.user.id != user_id);
        if members.len() == before {
            return Err(not_found("Member", user_id));
        }
        Ok(())
    }

    async fn list_escalation_policies(
        &self,
        query: &str,
    ) -> Result<Vec<EscalationPolicy>, ApiError> {
        let state = self.enter("list_escalation_policies")?;
        Ok(state
            .escalation_policies
            .values()
            .filter(|p| matches_query(&p.name, query))
            .cloned()
            .collect())
    }

    async fn create_escalation_policy(
        &self,
        policy: &EscalationPolicy,
    ) -> Result<EscalationPolicy, ApiError> {
        let mut state = self.enter("create_escalation_policy")?;
        let id = state.allocate_id();
        let mut created = policy.clone();
        created.id.clone_from(&id);
        for rule in &mut created.escalation_rules {
            rule.id = state.allocate_id();
        }
        state.escalation_policies.insert(id, created.clone());
        Ok(created)
    }

    async fn get_escalation_policy(&self, id: &str) -> Result<EscalationPolicy, ApiError> {
        let state = self.enter("get_escalation_policy")?;
        state
            .escalation_policies
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("Escalation Policy", id))
    }

    async fn update_escalation_policy(
        &self,
        id: &str,
        policy: &EscalationPolicy,
    ) -> Result<EscalationPolicy, ApiError> {
        let mut state = self.enter("update_escalation_policy")?;
        if !state.escalation_policies.contains_key(id) {
            return Err(not_found("Escalation Policy", id));
        }
        let mut updated = policy.clone();
        id.clone_into(&mut updated.id);
        for rule in &mut updated.escalation_rules {
            if rule.id.is_empty() {
                rule.id = state.allocate_id();
            }
        }
        state
            .escalation_policies
            .insert(id.to_owned(), updated.clone());
        Ok(updated)
    }

    async fn delete_escalation_policy(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter("delete_escalation_policy")?;
        state
            .escalation_policies
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Escalation Policy", id))
    }

    async fn create_extension(&self, extension: &Extension) -> Result<Extension, ApiError> {
        let mut state = self.enter("create_extension")?;
        let id = state.allocate_id();
        let mut created = extension.clone();
        created.id.clone_from(&id);
        created.html_url = Some(format!("https://example.pagerduty.com/extensions/{id}"));
        created.summary = Some(created.name.clone());
        state.extensions.insert(id, created.clone());
        Ok(created)
    }

    async fn get_extension(&self, id: &str) -> Result<Extension, ApiError> {
        let state = self.enter("get_extension")?;
        state
            .extensions
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("Extension", id))
    }

    async fn update_extension(
        &self,
        id: &str,
        extension: &Extension,
    ) -> Result<Extension, ApiError> {
        let mut state = self.enter("update_extension")?;
        let existing = state
            .extensions
            .get_mut(id)
            .ok_or_else(|| not_found("Extension", id))?;
        existing.name.clone_from(&extension.name);
        existing.summary = Some(extension.name.clone());
        existing.endpoint_url.clone_from(&extension.endpoint_url);
        existing.config.clone_from(&extension.config);
        Ok(existing.clone())
    }

    async fn delete_extension(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter("delete_extension")?;
        state
            .extensions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Extension", id))
    }

    async fn create_maintenance_window(
        &self,
        window: &MaintenanceWindow,
    ) -> Result<MaintenanceWindow, ApiError> {
        let mut state = self.enter("create_maintenance_window")?;
        let id = state.allocate_id();
        let mut created = window.clone();
        created.id.clone_from(&id);
        state.maintenance_windows.insert(id, created.clone());
        Ok(created)
    }

    async fn get_maintenance_window(&self, id: &str) -> Result<MaintenanceWindow, ApiError> {
        let state = self.enter("get_maintenance_window")?;
        state
            .maintenance_windows
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("Maintenance Window", id))
    }

    async fn update_maintenance_window(
        &self,
        id: &str,
        window: &MaintenanceWindow,
    ) -> Result<MaintenanceWindow, ApiError> {
        let mut state = self.enter("update_maintenance_window")?;
        if !state.maintenance_windows.contains_key(id) {
            return Err(not_found("Maintenance Window", id));
        }
        let mut updated = window.clone();
        id.clone_into(&mut updated.id);
        state
            .maintenance_windows
            .insert(id.to_owned(), updated.clone());
        Ok(updated)
    }

    async fn delete_maintenance_window(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter("delete_maintenance_window")?;
        state
            .maintenance_windows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Maintenance Window", id))
    }

    async fn list_addons(&self) -> Result<Vec<Addon>, ApiError> {
        let state = self.enter("list_addons")?;
        Ok(state.addons.values().cloned().collect())
    }

    async fn create_addon(&self, addon: &Addon) -> Result<Addon, ApiError> {
        let mut state = self.enter("create_addon")?;
        let id = state.allocate_id();
        let mut created = addon.clone();
        created.id.clone_from(&id);
        created.html_url = Some(format!("https://example.pagerduty.com/addons/{id}"));
        state.addons.insert(id, created.clone());
        Ok(created)
    }

    async fn get_addon(&self, id: &str) -> Result<Addon, ApiError> {
        let state = self.enter("get_addon")?;
        state
            .addons
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("Addon", id))
    }

    async fn update_addon(&self, id: &str, addon: &Addon) -> Result<Addon, ApiError> {
        let mut state = self.enter("update_addon")?;
        let existing = state.addons.get_mut(id).ok_or_else(|| not_found("Addon", id))?;
        existing.name.clone_from(&addon.name);
        existing.src.clone_from(&addon.src);
        Ok(existing.clone())
    }

    async fn delete_addon(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter("delete_addon")?;
        state
            .addons
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Addon", id))
    }

    async fn list_vendors(&self, query: &str) -> Result<Vec<Vendor>, ApiError> {
        let state = self.enter("list_vendors")?;
        Ok(state
            .vendors
            .iter()
            .filter(|v| matches_query(&v.name, query))
            .cloned()
            .collect())
    }

    async fn list_services(&self, query: &str) -> Result<Vec<Service>, ApiError> {
        let state = self.enter("list_services")?;
        Ok(state
            .services
            .iter()
            .filter(|s| matches_query(&s.name, query))
            .cloned()
            .collect())
    }

    async fn create_integration(
        &self,
        service_id: &str,
        integration: &Integration,
    ) -> Result<Integration, ApiError> {
        let mut state = self.enter("create_integration")?;
        if !state.services.iter().any(|s| s.id == service_id) {
            return Err(not_found("Service", service_id));
        }
        let id = state.allocate_id();
        let mut created = integration.clone();
        created.id.clone_from(&id);
        if created.kind.is_empty() {
            "generic_events_api_inbound_integration".clone_into(&mut created.kind);
        }
        created.service = Some(ApiObject::reference(service_id, "service_reference"));
        created.integration_key = Some(format!("key-{id}"));
        created.integration_email = Some(format!("{}@example.pagerduty.com", id.to_lowercase()));
        created.html_url = Some(format!(
            "https://example.pagerduty.com/services/{service_id}/integrations/{id}"
        ));
        state
            .integrations
            .insert((service_id.to_owned(), id), created.clone());
        Ok(created)
    }

    async fn get_integration(
        &self,
        service_id: &str,
        id: &str,
    ) -> Result<Integration, ApiError> {
        let state = self.enter("get_integration")?;
        state
            .integrations
            .get(&(service_id.to_owned(), id.to_owned()))
            .cloned()
            .ok_or_else(|| not_found("Integration", id))
    }

    async fn update_integration(
        &self,
        service_id: &str,
        id: &str,
        integration: &Integration,
    ) -> Result<Integration, ApiError> {
        let mut state = self.enter("update_integration")?;
        let existing = state
            .integrations
            .get_mut(&(service_id.to_owned(), id.to_owned()))
            .ok_or_else(|| not_found("Integration", id))?;
        existing.name.clone_from(&integration.name);
        Ok(existing.clone())
    }

    async fn delete_integration(&self, service_id: &str, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter("delete_integration")?;
        state
            .integrations
            .remove(&(service_id.to_owned(), id.to_owned()))
            .map(|_| ())
            .ok_or_else(|| not_found("Integration", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let mock = MockPagerDuty::new();
        let err = mock.get_user("PNOPE").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.calls("get_user"), 1);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let mock = MockPagerDuty::new();
        mock.fail_next("list_abilities", [500, 503]);

        assert_eq!(mock.list_abilities().await.unwrap_err().status(), Some(500));
        assert_eq!(mock.list_abilities().await.unwrap_err().status(), Some(503));
        assert_eq!(mock.list_abilities().await.unwrap(), vec!["teams"]);
        assert_eq!(mock.calls("list_abilities"), 3);
    }

    #[tokio::test]
    async fn persistent_failures_last_until_cleared() {
        let mock = MockPagerDuty::new();
        mock.fail_always("list_addons", 502);

        assert_eq!(mock.list_addons().await.unwrap_err().status(), Some(502));
        assert_eq!(mock.list_addons().await.unwrap_err().status(), Some(502));

        mock.clear_failures();
        assert!(mock.list_addons().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn membership_is_reflected_on_the_user() {
        let mock = MockPagerDuty::new();
        let user = mock.insert_user("Ada", "ada@example.com");
        let team = mock.insert_team("Engineering", None);

        mock.add_user_to_team(&team, &user, "observer").await.unwrap();
        mock.add_user_to_team(&team, &user, "manager").await.unwrap();

        let members = mock.members(&team);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, "manager");

        let fetched = mock.get_user(&user).await.unwrap();
        assert_eq!(fetched.teams[0].id, team);
    }
}
