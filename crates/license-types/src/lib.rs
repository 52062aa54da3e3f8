//! Shared types for the license admin API and the Discord key bot

pub mod access;
pub mod envelope;
pub mod records;
mod snowflake;

pub use access::AccessSettings;
pub use envelope::{ApiCallResult, ApiError, ApiFailure, ApiOutcome};
pub use records::{KeyRecord, LinkRequest, NewKey, ResetDevicesRequest, MAX_DEVICES};
