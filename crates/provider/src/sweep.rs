//! Cleanup of objects left behind by test runs.

use pagerform_api::PagerDutyApi;
use tracing::{info, instrument};

use crate::error::ProviderError;

/// Name prefixes used by test fixtures.
pub const TEST_PREFIXES: [&str; 2] = ["test", "tf-"];

/// Returns `true` if `name` looks like a test fixture.
pub fn is_test_name(name: &str) -> bool {
    TEST_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Delete every add-on whose name starts with a test prefix.
///
/// Returns the IDs of the deleted add-ons. Stops at the first failed delete.
#[instrument(skip(api))]
pub async fn sweep_addons(api: &dyn PagerDutyApi) -> Result<Vec<String>, ProviderError> {
    let mut deleted = Vec::new();

    for addon in api.list_addons().await? {
        if !is_test_name(&addon.name) {
            continue;
        }
        info!(name = %addon.name, id = %addon.id, "destroying add-on");
        api.delete_addon(&addon.id).await?;
        deleted.push(addon.id);
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use pagerform_api::MockPagerDuty;

    use super::*;

    #[test]
    fn recognises_fixture_names() {
        assert!(is_test_name("tf-abc12"));
        assert!(is_test_name("testing"));
        assert!(!is_test_name("Status page"));
        assert!(!is_test_name("my-tf-addon"));
    }

    #[tokio::test]
    async fn deletes_only_test_addons() {
        let mock = MockPagerDuty::new();
        let keep = mock.insert_addon("Status page", "https://intranet.foo.com/status");
        let a = mock.insert_addon("tf-abc12", "https://intranet.foo.com/a");
        let b = mock.insert_addon("test addon", "https://intranet.foo.com/b");

        let mut deleted = sweep_addons(&mock).await.unwrap();
        deleted.sort();

        assert_eq!(deleted, vec![a, b]);
        assert_eq!(mock.addon_ids(), vec![keep]);
    }

    #[tokio::test]
    async fn delete_failure_stops_the_sweep() {
        let mock = MockPagerDuty::new();
        mock.insert_addon("tf-one", "https://intranet.foo.com/1");
        mock.fail_next("delete_addon", [403]);

        let err = sweep_addons(&mock).await.unwrap_err();

        assert!(matches!(err, ProviderError::Api(ref e) if e.status() == Some(403)));
        assert_eq!(mock.addon_ids().len(), 1);
    }
}
