use serde::Deserialize;
use thiserror::Error;

/// Errors returned by [`PagerDutyApi`](crate::PagerDutyApi) implementations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The `PagerDuty` API returned a non-success response.
    #[error("PagerDuty API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// A request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Serialization(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Deserialization(String),

    /// The client was built with invalid settings.
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    /// Build an [`ApiError::Api`] from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status code, if the error came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Serialization(_) | Self::Deserialization(_) | Self::Configuration(_) => None,
        }
    }

    /// Returns `true` if the remote object does not exist (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` for HTTP 5xx responses.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }

    /// Build an error from a non-success response body.
    ///
    /// `PagerDuty` wraps failures as `{"error": {"message": ..., "errors": [...]}}`.
    /// Bodies that do not follow that shape are reported verbatim.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Body,
        }

        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            message: String,
            #[serde(default)]
            errors: Vec<String>,
        }

        let message = match serde_json::from_str::<Envelope>(body) {
            Ok(Envelope { error }) if error.errors.is_empty() => error.message,
            Ok(Envelope { error }) => format!("{}: {}", error.message, error.errors.join(", ")),
            Err(_) if body.is_empty() => "empty response body".to_owned(),
            Err(_) => body.to_owned(),
        };

        Self::api(status, message)
    }
}
