//! Failure taxonomy for command handling.
//!
//! [`Rejection`]s are local precondition failures answered before any remote
//! call. [`CommandError`]s abort a workflow after it has been deferred and are
//! shown to the invoking user as the final reply. Reply delivery failures are
//! classified and logged by [`log_reply_error`] and never shown.

use std::time::Duration;

use license_types::ApiFailure;
use serenity::http::HttpError;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::access::StoreError;
use crate::reply::ReplyError;

/// Prefix of every user-facing failure message.
const FAILURE_PREFIX: &str = "❌ An error occurred: ";

/// Precondition failures, rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("⛔ This command must be used inside a server, not in a direct message.")]
    GuildOnly,

    #[error("⛔ You need the <@&{0}> role to use this command.")]
    MissingAllowedRole(u64),

    #[error("⛔ You do not have permission to use this command.")]
    MissingSupportRole,

    #[error("Internal configuration error. Contact an administrator.")]
    ConfigUnavailable,
}

/// Failures that abort a workflow once it has been deferred.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Message reported by the admin API, or its local fallback.
    #[error("{0}")]
    Remote(String),

    #[error("Could not save the configuration.")]
    ConfigSave(#[source] StoreError),
}

impl CommandError {
    /// A remote failure, logged with its diagnostic detail.
    pub fn remote(failure: ApiFailure) -> Self {
        log_api_failure(&failure);
        CommandError::Remote(failure.message)
    }

    /// Text of the final reply shown to the user.
    pub fn user_message(&self) -> String {
        format!("{}{}", FAILURE_PREFIX, self)
    }
}

/// Log a failed admin API call, including the detail hidden from users.
pub fn log_api_failure(failure: &ApiFailure) {
    match &failure.details {
        Some(details) => warn!(
            "Admin API failure (HTTP {}): {} [{}]",
            failure.status, failure.message, details
        ),
        None => warn!(
            "Admin API failure (HTTP {}): {}",
            failure.status, failure.message
        ),
    }
}

/// How a failed Discord reply should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyFailure {
    /// The interaction token is no longer valid; nothing can be sent.
    Expired,
    /// Discord refused the request; retrying will not help.
    Permanent,
    /// Rate limited; the request could be sent again after this delay.
    RateLimited(Duration),
    /// Network or server-side problem.
    Transient,
}

/// Discord JSON error codes meaning the interaction can no longer be answered.
const UNKNOWN_INTERACTION: isize = 10062;
const UNKNOWN_WEBHOOK: isize = 10015;
const ALREADY_ACKNOWLEDGED: isize = 40060;

/// Classify a failed Discord HTTP response by status and JSON error code.
pub fn classify_status(status: u16, code: isize) -> ReplyFailure {
    match (status, code) {
        (_, UNKNOWN_INTERACTION | UNKNOWN_WEBHOOK | ALREADY_ACKNOWLEDGED) => ReplyFailure::Expired,
        (429, _) => ReplyFailure::RateLimited(Duration::from_secs(1)),
        (400..=499, _) => ReplyFailure::Permanent,
        _ => ReplyFailure::Transient,
    }
}

/// Classify a serenity error.
pub fn classify(err: &serenity::Error) -> ReplyFailure {
    match err {
        serenity::Error::Http(http_err) => classify_http(http_err),
        _ => ReplyFailure::Transient,
    }
}

fn classify_http(http_err: &HttpError) -> ReplyFailure {
    match http_err {
        HttpError::UnsuccessfulRequest(resp) => {
            classify_status(resp.status_code.as_u16(), resp.error.code as isize)
        }
        _ => ReplyFailure::Transient,
    }
}

/// Log a failed reply at the level matching its classification.
pub fn log_reply_error(context: &str, err: &ReplyError) {
    let ReplyError::Discord(e) = err;
    let failure = classify(e);

    match failure {
        ReplyFailure::Expired => {
            warn!("{}: interaction expired before the reply was sent: {}", context, err);
        }
        ReplyFailure::Permanent => {
            error!("{}: {}", context, err);
        }
        ReplyFailure::RateLimited(dur) => {
            warn!("{}: rate limited, retry after {:?}", context, dur);
        }
        ReplyFailure::Transient => {
            debug!("{}: transient reply failure: {}", context, err);
        }
    }
}
