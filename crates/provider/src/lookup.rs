//! Read-only data-source lookups.
//!
//! Each lookup asks the server to filter with `query=`, which is fuzzy, then
//! matches client-side.

use pagerform_api::{EscalationPolicy, PagerDutyApi, Service, Team, User, Vendor};
use regex::RegexBuilder;
use tracing::{info, instrument, warn};

use crate::error::ProviderError;

/// First element matching `pred`, warning when the match is ambiguous.
fn first_match<T>(kind: &str, term: &str, items: Vec<T>, pred: impl Fn(&T) -> bool) -> Option<T> {
    let mut matches = items.into_iter().filter(|item| pred(item));
    let found = matches.next()?;
    let extra = matches.count();
    if extra > 0 {
        warn!(
            kind,
            term,
            matches = extra + 1,
            "lookup is ambiguous, using the first match"
        );
    }
    Some(found)
}

/// Find a user by exact email address.
#[instrument(skip(api))]
pub async fn lookup_user(api: &dyn PagerDutyApi, email: &str) -> Result<User, ProviderError> {
    info!("reading PagerDuty user");
    let users = api.list_users(email).await?;
    first_match("user", email, users, |u| u.email == email).ok_or_else(|| {
        ProviderError::NotFound {
            kind: "user",
            field: "the email",
            term: email.to_owned(),
        }
    })
}

/// Find a team by exact name.
#[instrument(skip(api))]
pub async fn lookup_team(api: &dyn PagerDutyApi, name: &str) -> Result<Team, ProviderError> {
    info!("reading PagerDuty team");
    let teams = api.list_teams(name).await?;
    first_match("team", name, teams, |t| t.name == name).ok_or_else(|| ProviderError::NotFound {
        kind: "team",
        field: "name",
        term: name.to_owned(),
    })
}

/// Find an escalation policy by exact name.
#[instrument(skip(api))]
pub async fn lookup_escalation_policy(
    api: &dyn PagerDutyApi,
    name: &str,
) -> Result<EscalationPolicy, ProviderError> {
    info!("reading PagerDuty escalation policy");
    let policies = api.list_escalation_policies(name).await?;
    first_match("escalation policy", name, policies, |p| p.name == name).ok_or_else(|| {
        ProviderError::NotFound {
            kind: "escalation policy",
            field: "the name",
            term: name.to_owned(),
        }
    })
}

/// Find a service by exact name.
#[instrument(skip(api))]
pub async fn lookup_service(api: &dyn PagerDutyApi, name: &str) -> Result<Service, ProviderError> {
    info!("reading PagerDuty service");
    let services = api.list_services(name).await?;
    first_match("service", name, services, |s| s.name == name).ok_or_else(|| {
        ProviderError::NotFound {
            kind: "service",
            field: "the name",
            term: name.to_owned(),
        }
    })
}

/// Find a vendor by name.
///
/// Tries a case-insensitive exact match first, then a case-insensitive
/// regular-expression match anywhere in the name. A term that is not a valid
/// regular expression is matched literally.
#[instrument(skip(api))]
pub async fn lookup_vendor(api: &dyn PagerDutyApi, name: &str) -> Result<Vendor, ProviderError> {
    info!("reading PagerDuty vendor");
    let vendors = api.list_vendors(name).await?;

    let wanted = name.to_lowercase();
    let exact = vendors.iter().position(|v| v.name.to_lowercase() == wanted);

    let found = match exact {
        Some(index) => vendors.into_iter().nth(index),
        None => {
            let pattern = RegexBuilder::new(name)
                .case_insensitive(true)
                .build()
                .or_else(|_| {
                    RegexBuilder::new(&regex::escape(name))
                        .case_insensitive(true)
                        .build()
                })
                .map_err(|e| ProviderError::Validation(e.to_string()))?;
            first_match("vendor", name, vendors, |v| pattern.is_match(&v.name))
        }
    };

    found.ok_or_else(|| ProviderError::NotFound {
        kind: "vendor",
        field: "the name",
        term: name.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use pagerform_api::MockPagerDuty;

    use super::*;

    #[tokio::test]
    async fn user_by_exact_email() {
        let mock = MockPagerDuty::new();
        mock.insert_user("Other", "earline.other@foo.com");
        let id = mock.insert_user("Earline", "earline@foo.com");

        let user = lookup_user(&mock, "earline@foo.com").await.unwrap();
        assert_eq!(user.id, id);

        let err = lookup_user(&mock, "earline@bar.com").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to locate any user with the email: earline@bar.com"
        );
    }

    #[tokio::test]
    async fn team_requires_exact_name() {
        let mock = MockPagerDuty::new();
        mock.insert_team("Engineering Ops", None);
        let id = mock.insert_team("Engineering", Some("Builds things"));

        let team = lookup_team(&mock, "Engineering").await.unwrap();
        assert_eq!(team.id, id);
        assert_eq!(team.description.as_deref(), Some("Builds things"));

        let err = lookup_team(&mock, "engineering").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to locate any team with name: engineering"
        );
    }

    #[tokio::test]
    async fn escalation_policy_and_service_by_name() {
        let mock = MockPagerDuty::new();
        let policy = mock.insert_escalation_policy("Primary");
        let service = mock.insert_service("API");

        assert_eq!(lookup_escalation_policy(&mock, "Primary").await.unwrap().id, policy);
        assert_eq!(lookup_service(&mock, "API").await.unwrap().id, service);

        let err = lookup_service(&mock, "Billing").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to locate any service with the name: Billing"
        );
    }

    #[tokio::test]
    async fn ambiguous_lookup_takes_first_in_list_order() {
        let mock = MockPagerDuty::new();
        let first = mock.insert_service("API");
        mock.insert_service("API");

        assert_eq!(lookup_service(&mock, "API").await.unwrap().id, first);
    }

    #[tokio::test]
    async fn vendor_exact_match_is_case_insensitive() {
        let mock = MockPagerDuty::new();
        mock.insert_vendor("Datadog Agent", "datadog_agent");
        let id = mock.insert_vendor("Datadog", "datadog");

        let vendor = lookup_vendor(&mock, "datadog").await.unwrap();
        assert_eq!(vendor.id, id);
        assert_eq!(vendor.generic_service_type.as_deref(), Some("datadog"));
    }

    #[tokio::test]
    async fn vendor_falls_back_to_partial_match() {
        let mock = MockPagerDuty::new();
        let id = mock.insert_vendor("Amazon CloudWatch", "aws_cloudwatch");

        let vendor = lookup_vendor(&mock, "cloudwatch").await.unwrap();
        assert_eq!(vendor.id, id);
    }

    #[tokio::test]
    async fn vendor_term_with_regex_metacharacters() {
        let mock = MockPagerDuty::new();
        let id = mock.insert_vendor("Foo (Legacy)", "foo");

        let vendor = lookup_vendor(&mock, "(legacy").await.unwrap();
        assert_eq!(vendor.id, id);

        let err = lookup_vendor(&mock, "Bar").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to locate any vendor with the name: Bar"
        );
    }
}
