//! Client for the license admin API.
//!
//! | Concern | Item |
//! |---------|------|
//! | Production client | [`AdminClient`] |
//! | Workflow seam | [`AdminApi`] |
//! | Test double | [`MockAdminApi`]* |
//!
//! *Available with `#[cfg(test)]` or the `"test-support"` feature.
//!
//! Every call resolves to a [`license_types::ApiCallResult`]; unreachable
//! servers and non-JSON replies are folded into that envelope instead of
//! being returned as errors.

pub mod api;
pub mod client;
pub mod endpoints;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use api::{list_key_records, AdminApi};
pub use client::{AdminClient, AdminClientConfig};
pub use error::{Error, Result};
#[cfg(any(test, feature = "test-support"))]
pub use mock::{MockAdminApi, RecordedCall};
