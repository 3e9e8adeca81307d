use serde::{Deserialize, Serialize};

/// A typed `{id, type}` pointer at another `PagerDuty` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiReference {
    /// ID of the referenced object.
    pub id: String,
    /// Reference type, e.g. `"team_reference"`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl ApiReference {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// The common header `PagerDuty` attaches to every object it returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiObject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

impl ApiObject {
    /// A bare `{id, type}` object, as sent in request bodies.
    pub fn reference(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }
}

/// A `PagerDuty` user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default = "user_type")]
    pub kind: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default)]
    pub invitation_sent: bool,
    /// Teams the user belongs to. Read-only on the wire.
    #[serde(default, skip_serializing)]
    pub teams: Vec<ApiObject>,
}

fn user_type() -> String {
    "user".to_owned()
}

/// A `PagerDuty` team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// An entry of `GET /teams/{id}/members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: ApiObject,
    pub role: String,
}

/// One level of an escalation policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub escalation_delay_in_minutes: u32,
    #[serde(default)]
    pub targets: Vec<ApiObject>,
}

/// A `PagerDuty` escalation policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default = "escalation_policy_type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub num_loops: u32,
    #[serde(default)]
    pub escalation_rules: Vec<EscalationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<ApiReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

fn escalation_policy_type() -> String {
    "escalation_policy".to_owned()
}

/// A `PagerDuty` extension (webhook, Slack, ...) attached to services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default = "extension_type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    pub extension_schema: ApiObject,
    #[serde(default)]
    pub extension_objects: Vec<ApiObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

fn extension_type() -> String {
    "extension".to_owned()
}

/// A window during which the listed services do not create incidents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default = "maintenance_window_type")]
    pub kind: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub services: Vec<ApiObject>,
}

fn maintenance_window_type() -> String {
    "maintenance_window".to_owned()
}

/// A full-page or incident add-on embedded in the web UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default = "addon_type")]
    pub kind: String,
    pub name: String,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

fn addon_type() -> String {
    "full_page_addon".to_owned()
}

/// An integration vendor (monitoring tool).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A `PagerDuty` service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// An inbound integration attached to a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ApiObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<ApiObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_reference_uses_type_key() {
        let json = serde_json::to_value(ApiReference::new("PT1", "team_reference")).unwrap();
        assert_eq!(json, serde_json::json!({"id": "PT1", "type": "team_reference"}));
    }

    #[test]
    fn api_object_reference_omits_empty_fields() {
        let json = serde_json::to_value(ApiObject::reference("PS1", "service_reference")).unwrap();
        assert_eq!(json, serde_json::json!({"id": "PS1", "type": "service_reference"}));
    }

    #[test]
    fn user_deserializes_with_teams() {
        let json = r##"{
            "id": "PU1",
            "type": "user",
            "name": "Earline Greenholt",
            "email": "earline@example.com",
            "time_zone": "America/Lima",
            "color": "green",
            "role": "admin",
            "avatar_url": "https://secure.gravatar.com/avatar/1",
            "invitation_sent": true,
            "teams": [{"id": "PT1", "type": "team_reference", "summary": "Engineering"}]
        }"##;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "PU1");
        assert_eq!(user.time_zone.as_deref(), Some("America/Lima"));
        assert!(user.invitation_sent);
        assert_eq!(user.teams.len(), 1);
        assert_eq!(user.teams[0].summary.as_deref(), Some("Engineering"));
    }

    #[test]
    fn user_serialization_skips_read_only_teams() {
        let user = User {
            name: "a".into(),
            email: "a@example.com".into(),
            teams: vec![ApiObject::reference("PT1", "team_reference")],
            ..User::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("teams").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn escalation_policy_round_trips_rules() {
        let json = r#"{
            "id": "PEP1",
            "type": "escalation_policy",
            "name": "Engineering",
            "num_loops": 2,
            "escalation_rules": [
                {"id": "PR1", "escalation_delay_in_minutes": 10,
                 "targets": [{"id": "PU1", "type": "user_reference"}]}
            ],
            "teams": [{"id": "PT1", "type": "team_reference"}]
        }"#;
        let policy: EscalationPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.num_loops, 2);
        assert_eq!(policy.escalation_rules[0].escalation_delay_in_minutes, 10);
        assert_eq!(policy.escalation_rules[0].targets[0].kind, "user_reference");
        assert_eq!(policy.teams[0].id, "PT1");
    }

    #[test]
    fn extension_config_is_free_form() {
        let json = r#"{
            "id": "PE1",
            "name": "webhook",
            "extension_schema": {"id": "PJFWPEP", "type": "extension_schema_reference"},
            "extension_objects": [{"id": "PS1", "type": "service_reference"}],
            "config": {"restrict": "any", "notify_types": {"resolve": true}}
        }"#;
        let ext: Extension = serde_json::from_str(json).unwrap();
        assert_eq!(ext.kind, "extension");
        assert_eq!(ext.config.unwrap()["notify_types"]["resolve"], true);
    }

    #[test]
    fn addon_defaults_to_full_page() {
        let addon: Addon =
            serde_json::from_str(r#"{"name": "status", "src": "https://intranet.foo.com/status"}"#)
                .unwrap();
        assert_eq!(addon.kind, "full_page_addon");
    }
}
