//! Normalized result of a call to the remote admin API
//!
//! [`ApiCallResult`] is the only contract between the admin client and the
//! bot workflows: transport errors and non-JSON replies are folded into it
//! by the client, so callers never handle raw transport failures.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error object carried in an [`ApiCallResult`] payload.
///
/// Either synthesized locally by the client or sent by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Envelope returned for every admin API call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiCallResult {
    pub ok: bool,
    pub status: u16,
    pub payload: serde_json::Value,
}

impl ApiCallResult {
    /// A failed call whose payload is a synthesized [`ApiError`].
    pub fn failure(status: u16, error: ApiError) -> Self {
        Self {
            ok: false,
            status,
            payload: serde_json::to_value(error).unwrap_or(serde_json::Value::Null),
        }
    }

    /// The payload's `error` field, when it holds a non-empty string.
    pub fn error_message(&self) -> Option<String> {
        self.payload
            .get("error")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// The payload's `details` field, when present.
    pub fn error_details(&self) -> Option<String> {
        self.payload.get("details").and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    /// Convert into a tagged outcome, decoding the payload as `T` on success.
    ///
    /// `fallback` is the failure message used when the payload carries no
    /// `error` field of its own. A successful status whose body holds an
    /// `error` field, or does not decode as `T`, is reported as a failure.
    pub fn into_outcome<T: DeserializeOwned>(self, fallback: &str) -> ApiOutcome<T> {
        if !self.ok || self.error_message().is_some() {
            return ApiOutcome::Failure(ApiFailure {
                status: self.status,
                message: self.error_message().unwrap_or_else(|| fallback.to_string()),
                details: self.error_details(),
            });
        }

        let status = self.status;
        let details = self.error_details();
        match serde_json::from_value::<T>(self.payload) {
            Ok(value) => ApiOutcome::Success(value),
            Err(e) => ApiOutcome::Failure(ApiFailure {
                status,
                message: fallback.to_string(),
                details: Some(details.unwrap_or_else(|| format!("unexpected response body: {}", e))),
            }),
        }
    }
}

/// Details of a failed admin API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub status: u16,
    /// Human-readable message, safe to show to the invoking user.
    pub message: String,
    /// Diagnostic detail for logs only.
    pub details: Option<String>,
}

/// Typed outcome of an admin API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success(T),
    Failure(ApiFailure),
}

impl<T> ApiOutcome<T> {
    pub fn into_result(self) -> Result<T, ApiFailure> {
        match self {
            ApiOutcome::Success(v) => Ok(v),
            ApiOutcome::Failure(f) => Err(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{KeyRecord, NewKey};
    use serde_json::json;

    #[test]
    fn test_failure_envelope_shape() {
        let r = ApiCallResult::failure(503, ApiError::new("could not reach server", "refused"));
        assert!(!r.ok);
        assert_eq!(r.status, 503);
        assert_eq!(
            r.payload,
            json!({ "error": "could not reach server", "details": "refused" })
        );
        assert_eq!(r.error_message().as_deref(), Some("could not reach server"));
        assert_eq!(r.error_details().as_deref(), Some("refused"));
    }

    #[test]
    fn test_outcome_success_decodes_payload() {
        let r = ApiCallResult {
            ok: true,
            status: 200,
            payload: json!({ "key": "PROPULSE-1" }),
        };
        let outcome: ApiOutcome<NewKey> = r.into_outcome("create failed");
        assert_eq!(
            outcome,
            ApiOutcome::Success(NewKey {
                key: "PROPULSE-1".to_string()
            })
        );
    }

    #[test]
    fn test_outcome_remote_error_is_verbatim() {
        let r = ApiCallResult {
            ok: false,
            status: 404,
            payload: json!({ "error": "Clé non trouvée" }),
        };
        let failure = r.into_outcome::<serde_json::Value>("fallback").into_result().unwrap_err();
        assert_eq!(failure.status, 404);
        assert_eq!(failure.message, "Clé non trouvée");
    }

    #[test]
    fn test_outcome_uses_fallback_without_error_field() {
        let r = ApiCallResult {
            ok: false,
            status: 500,
            payload: json!({ "something": "else" }),
        };
        let failure = r.into_outcome::<serde_json::Value>("fallback").into_result().unwrap_err();
        assert_eq!(failure.message, "fallback");
    }

    #[test]
    fn test_outcome_success_with_wrong_shape_is_failure() {
        let r = ApiCallResult {
            ok: true,
            status: 200,
            payload: json!({ "not_a_key": true }),
        };
        let outcome: ApiOutcome<NewKey> = r.into_outcome("Error while creating the key.");
        match outcome {
            ApiOutcome::Failure(f) => {
                assert_eq!(f.status, 200);
                assert_eq!(f.message, "Error while creating the key.");
                assert!(f.details.is_some());
            }
            ApiOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn test_outcome_success_status_with_error_field_is_failure() {
        let r = ApiCallResult {
            ok: true,
            status: 200,
            payload: json!({ "error": "key already linked" }),
        };
        let failure = r.into_outcome::<serde_json::Value>("fallback").into_result().unwrap_err();
        assert_eq!(failure.message, "key already linked");
    }

    #[test]
    fn test_outcome_list_of_records() {
        let r = ApiCallResult {
            ok: true,
            status: 200,
            payload: json!([{ "cle_unique": "A" }, { "cle_unique": "B", "discord_user_id": "7" }]),
        };
        let keys = r
            .into_outcome::<Vec<KeyRecord>>("list failed")
            .into_result()
            .unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[1].is_linked_to(7));
    }

    #[test]
    fn test_empty_error_string_is_ignored() {
        let r = ApiCallResult {
            ok: false,
            status: 400,
            payload: json!({ "error": "" }),
        };
        assert!(r.error_message().is_none());
    }
}
