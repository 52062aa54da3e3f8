//! The seam between the bot workflows and the remote admin API

use license_types::{ApiCallResult, ApiFailure, KeyRecord, LinkRequest, ResetDevicesRequest};
use tracing::warn;

/// Operations of the remote admin API used by the bot.
///
/// Implemented by [`crate::AdminClient`] (real HTTP) and
/// [`crate::MockAdminApi`] (in-memory, tests).
#[allow(async_fn_in_trait)]
pub trait AdminApi {
    /// `GET /admin/list`
    async fn list_keys(&self) -> ApiCallResult;

    /// `POST /admin/add`
    async fn add_key(&self) -> ApiCallResult;

    /// `POST /admin/link`
    async fn link_key(&self, request: &LinkRequest) -> ApiCallResult;

    /// `POST /admin/reset_devices`
    async fn reset_devices(&self, request: &ResetDevicesRequest) -> ApiCallResult;
}

/// Fetch the key list and decode it row by row.
///
/// The call fails only when the list itself is unavailable or is not an
/// array. Rows that do not decode as a [`KeyRecord`] are logged and skipped.
pub async fn list_key_records<A: AdminApi>(
    api: &A,
    fallback: &str,
) -> Result<Vec<KeyRecord>, ApiFailure> {
    let rows: Vec<serde_json::Value> = api.list_keys().await.into_outcome(fallback).into_result()?;
    let total = rows.len();

    let records: Vec<KeyRecord> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| match serde_json::from_value::<KeyRecord>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed key list row {}: {}", i, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            "Key list had {} malformed rows out of {}",
            total - records.len(),
            total
        );
    }
    Ok(records)
}
