//! Field validators and diff suppressors.
//!
//! Validators run before any request is sent and report exactly one error per
//! invalid field. Diff suppressors decide whether a remote value that differs
//! textually from the configured one is semantically the same.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::Value;
use tracing::error;

use crate::error::ProviderError;

const RFC3339_LAYOUT: &str = "2006-01-02T15:04:05Z07:00";

fn parse_rfc3339(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
}

/// Check that `value` is an RFC3339 timestamp.
pub fn validate_rfc3339(value: &str, key: &str) -> Result<(), ProviderError> {
    parse_rfc3339(value).map(|_| ()).map_err(|_| {
        ProviderError::Validation(format!(
            "{value} is not a valid format for argument: {key}. Expected format: {RFC3339_LAYOUT} (RFC3339)"
        ))
    })
}

/// Check that `value` is one of `allowed`.
pub fn validate_value(value: &str, key: &str, allowed: &[&str]) -> Result<(), ProviderError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ProviderError::Validation(format!(
            "{value:?} is an invalid value for argument {key}. Must be one of {allowed:?}"
        )))
    }
}

/// Check that `value` is a well-formed JSON document.
pub fn validate_json_string(value: &str, key: &str) -> Result<(), ProviderError> {
    serde_json::from_str::<Value>(value)
        .map(|_| ())
        .map_err(|e| ProviderError::Validation(format!("{key} contains an invalid JSON: {e}")))
}

/// `true` iff both strings parse as RFC3339 and denote the same instant.
pub fn suppress_rfc3339_diff(key: &str, old: &str, new: &str) -> bool {
    let Ok(old_t) = parse_rfc3339(old) else {
        error!(key, value = old, "failed to parse old value as RFC3339");
        return false;
    };
    let Ok(new_t) = parse_rfc3339(new) else {
        error!(key, value = new, "failed to parse new value as RFC3339");
        return false;
    };
    old_t == new_t
}

/// `true` iff both strings are JSON documents with equal values, ignoring
/// whitespace and object key order.
pub fn suppress_json_diff(old: &str, new: &str) -> bool {
    match (
        serde_json::from_str::<Value>(old),
        serde_json::from_str::<Value>(new),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Normalise an RFC3339 timestamp to UTC.
pub fn time_to_utc(value: &str) -> Result<String, ProviderError> {
    let t = parse_rfc3339(value).map_err(|e| ProviderError::Validation(e.to_string()))?;
    Ok(t.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_accepts_valid_timestamps() {
        for value in [
            "2015-11-09T20:00:00-05:00",
            "2020-01-01T00:00:00Z",
            "2020-01-01T00:00:00.123+02:00",
        ] {
            validate_rfc3339(value, "start_time").unwrap();
            assert!(DateTime::parse_from_rfc3339(value).is_ok());
        }
    }

    #[test]
    fn rfc3339_rejects_malformed_timestamps() {
        for value in ["2015-11-09", "tomorrow", "2015-11-09 20:00:00", ""] {
            let err = validate_rfc3339(value, "end_time").unwrap_err();
            assert_eq!(
                err.to_string(),
                format!(
                    "{value} is not a valid format for argument: end_time. \
                     Expected format: 2006-01-02T15:04:05Z07:00 (RFC3339)"
                )
            );
        }
    }

    #[test]
    fn enum_validation_lists_allowed_values() {
        let allowed = ["observer", "responder", "manager"];
        validate_value("manager", "role", &allowed).unwrap();

        let err = validate_value("owner", "role", &allowed).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#""owner" is an invalid value for argument role. Must be one of ["observer", "responder", "manager"]"#
        );
    }

    #[test]
    fn json_validation() {
        validate_json_string(r#"{"restrict": "any"}"#, "config").unwrap();
        assert!(validate_json_string("{restrict: any}", "config").is_err());
    }

    #[test]
    fn rfc3339_diff_compares_instants() {
        assert!(suppress_rfc3339_diff(
            "start_time",
            "2020-01-01T00:00:00Z",
            "2020-01-01T00:00:00+00:00"
        ));
        assert!(suppress_rfc3339_diff(
            "start_time",
            "2015-11-09T20:00:00-05:00",
            "2015-11-10T01:00:00Z"
        ));
        assert!(!suppress_rfc3339_diff(
            "start_time",
            "2015-11-09T20:00:00-05:00",
            "2015-11-09T20:00:00Z"
        ));
    }

    #[test]
    fn rfc3339_diff_requires_both_to_parse() {
        assert!(!suppress_rfc3339_diff("end_time", "garbage", "garbage"));
        assert!(!suppress_rfc3339_diff(
            "end_time",
            "2020-01-01T00:00:00Z",
            "garbage"
        ));
    }

    #[test]
    fn json_diff_ignores_formatting() {
        assert!(suppress_json_diff(
            r#"{"a": 1, "b": [1, 2]}"#,
            "{\n  \"b\": [1,2],\n  \"a\": 1\n}"
        ));
        assert!(!suppress_json_diff(r#"{"a": 1}"#, r#"{"a": 2}"#));
        assert!(!suppress_json_diff("not json", "not json"));
    }

    #[test]
    fn converts_to_utc() {
        assert_eq!(
            time_to_utc("2015-11-09T20:00:00-05:00").unwrap(),
            "2015-11-10T01:00:00Z"
        );
        assert!(time_to_utc("yesterday").is_err());
    }
}
