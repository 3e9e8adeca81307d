use std::time::Duration;

use pagerform_api::ApiError;
use thiserror::Error;

/// Appended to every credential failure.
pub const INVALID_CREDENTIALS: &str = "No valid credentials found for PagerDuty provider.
Set PAGERDUTY_TOKEN or the `token` key of the [pagerduty] configuration table.";

/// Errors that can occur while reconciling `PagerDuty` resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote API rejected a request. Propagated verbatim.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A local attribute failed validation before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// A resource ID could not be parsed.
    #[error("invalid ID {id:?}: {reason}")]
    InvalidId {
        /// The offending ID.
        id: String,
        /// What was expected.
        reason: String,
    },

    /// A data-source lookup matched nothing.
    #[error("Unable to locate any {kind} with {field}: {term}")]
    NotFound {
        /// Object kind, e.g. `"vendor"`.
        kind: &'static str,
        /// Phrase naming the searched field, e.g. `"the name"`.
        field: &'static str,
        /// The search term.
        term: String,
    },

    /// No token was configured.
    #[error("{creds}", creds = INVALID_CREDENTIALS)]
    MissingCredentials,

    /// The token was rejected by `GET /abilities`.
    #[error("{0}\n{creds}", creds = INVALID_CREDENTIALS)]
    Credentials(#[source] ApiError),

    /// A retried operation kept failing with server errors until its deadline.
    #[error("timeout after {timeout:?} retrying {operation}: {last}")]
    RetryTimeout {
        /// Name of the retried operation.
        operation: String,
        /// Wall-clock budget that elapsed.
        timeout: Duration,
        /// The error returned by the final attempt.
        #[source]
        last: ApiError,
    },

    /// A resource could not be imported.
    #[error("{0}")]
    Import(String),

    /// Invalid provider configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl ProviderError {
    pub(crate) fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the underlying API error was a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_not_found())
    }
}
