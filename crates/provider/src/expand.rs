//! Conversions between local ID lists and `PagerDuty` reference types.
//!
//! All helpers are pure and total.

use pagerform_api::{ApiObject, ApiReference, EscalationRule};
use serde::{Deserialize, Serialize};

/// Default target type of an escalation rule.
pub const USER_REFERENCE: &str = "user_reference";

pub fn expand_api_reference(ids: &[String], kind: &str) -> Vec<ApiReference> {
    ids.iter().map(|id| ApiReference::new(id, kind)).collect()
}

pub fn flatten_api_reference(refs: &[ApiReference]) -> Vec<String> {
    refs.iter().map(|r| r.id.clone()).collect()
}

pub fn expand_api_objects<'a>(
    kind: &str,
    ids: impl IntoIterator<Item = &'a String>,
) -> Vec<ApiObject> {
    ids.into_iter()
        .map(|id| ApiObject::reference(id, kind))
        .collect()
}

pub fn flatten_api_objects(objects: &[ApiObject]) -> Vec<String> {
    objects.iter().map(|o| o.id.clone()).collect()
}

/// Drop empty entries from a configured list of strings.
pub fn expand_string_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter(|v| !v.as_ref().is_empty())
        .map(|v| v.as_ref().to_owned())
        .collect()
}

/// IDs of the teams a user belongs to.
pub fn flatten_teams(teams: &[ApiObject]) -> Vec<String> {
    flatten_api_objects(teams)
}

/// One escalation rule as configured locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAttrs {
    /// Assigned by `PagerDuty`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub escalation_delay_in_minutes: u32,
    #[serde(default)]
    pub targets: Vec<TargetAttrs>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAttrs {
    pub id: String,
    #[serde(rename = "type", default = "default_target_type")]
    pub kind: String,
}

fn default_target_type() -> String {
    USER_REFERENCE.to_owned()
}

impl TargetAttrs {
    /// A `user_reference` target.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: default_target_type(),
        }
    }
}

pub fn expand_escalation_rules(rules: &[RuleAttrs]) -> Vec<EscalationRule> {
    rules
        .iter()
        .map(|rule| EscalationRule {
            id: rule.id.clone().unwrap_or_default(),
            escalation_delay_in_minutes: rule.escalation_delay_in_minutes,
            targets: rule
                .targets
                .iter()
                .map(|t| ApiObject::reference(&t.id, &t.kind))
                .collect(),
        })
        .collect()
}

pub fn flatten_escalation_rules(rules: &[EscalationRule]) -> Vec<RuleAttrs> {
    rules
        .iter()
        .map(|rule| RuleAttrs {
            id: Some(rule.id.clone()).filter(|id| !id.is_empty()),
            escalation_delay_in_minutes: rule.escalation_delay_in_minutes,
            targets: rule
                .targets
                .iter()
                .map(|t| TargetAttrs {
                    id: t.id.clone(),
                    kind: t.kind.clone(),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn reference_round_trip_preserves_order() {
        for list in [ids(&[]), ids(&["PT1"]), ids(&["PT2", "PT1", "PT2"])] {
            let refs = expand_api_reference(&list, "team_reference");
            assert!(refs.iter().all(|r| r.kind == "team_reference"));
            assert_eq!(flatten_api_reference(&refs), list);
        }
    }

    #[test]
    fn object_round_trip() {
        let list = ids(&["PS1", "PS2"]);
        let objects = expand_api_objects("service_reference", &list);
        assert_eq!(objects[1], ApiObject::reference("PS2", "service_reference"));
        assert_eq!(flatten_api_objects(&objects), list);
    }

    #[test]
    fn string_list_drops_empty_values() {
        assert_eq!(expand_string_list(["a", "", "b"]), ids(&["a", "b"]));
        assert!(expand_string_list(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn escalation_rules_round_trip() {
        let rules = vec![RuleAttrs {
            id: None,
            escalation_delay_in_minutes: 10,
            targets: vec![
                TargetAttrs::user("PU1"),
                TargetAttrs {
                    id: "PS1".into(),
                    kind: "schedule_reference".into(),
                },
            ],
        }];
        let expanded = expand_escalation_rules(&rules);
        assert_eq!(expanded[0].id, "");
        assert_eq!(expanded[0].targets[0].kind, "user_reference");
        assert_eq!(flatten_escalation_rules(&expanded), rules);
    }

    #[test]
    fn target_type_defaults_to_user_reference() {
        let target: TargetAttrs = serde_json::from_str(r#"{"id": "PU1"}"#).unwrap();
        assert_eq!(target.kind, USER_REFERENCE);
    }
}
