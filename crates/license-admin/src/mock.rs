//! In-memory admin API for unit testing without a remote server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use license_types::{ApiCallResult, ApiError, KeyRecord, LinkRequest, ResetDevicesRequest};

use crate::api::AdminApi;
use crate::endpoints;

/// A call made against [`MockAdminApi`]: endpoint path and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: &'static str,
    pub body: Option<serde_json::Value>,
}

/// Admin API double with one scripted response per endpoint.
///
/// Endpoints without a scripted response answer 404 with an error payload.
///
/// # Example
/// ```rust,ignore
/// let api = MockAdminApi::new().with_keys(vec![]).with_new_key("PROPULSE-1").with_link_ok();
/// issue_key(&api, &store, &invoker, &sink).await;
/// assert_eq!(api.endpoints(), vec!["/admin/list", "/admin/add", "/admin/link"]);
/// ```
#[derive(Clone, Default)]
pub struct MockAdminApi {
    responses: Arc<Mutex<HashMap<&'static str, ApiCallResult>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockAdminApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response returned for `endpoint`.
    pub fn with_response(self, endpoint: &'static str, result: ApiCallResult) -> Self {
        self.responses.lock().unwrap().insert(endpoint, result);
        self
    }

    /// `GET /admin/list` succeeds with `keys`.
    pub fn with_keys(self, keys: Vec<KeyRecord>) -> Self {
        let payload = serde_json::to_value(keys).unwrap();
        self.with_response(endpoints::LIST, ok(payload))
    }

    /// `POST /admin/add` succeeds with `key`.
    pub fn with_new_key(self, key: &str) -> Self {
        self.with_response(endpoints::ADD, ok(serde_json::json!({ "key": key })))
    }

    /// `POST /admin/link` succeeds.
    pub fn with_link_ok(self) -> Self {
        self.with_response(endpoints::LINK, ok(serde_json::json!({ "success": true })))
    }

    /// `POST /admin/reset_devices` succeeds.
    pub fn with_reset_ok(self) -> Self {
        self.with_response(
            endpoints::RESET_DEVICES,
            ok(serde_json::json!({ "success": true })),
        )
    }

    /// `endpoint` fails with `status` and a remote `error` message.
    pub fn with_error(self, endpoint: &'static str, status: u16, message: &str) -> Self {
        self.with_response(
            endpoint,
            ApiCallResult {
                ok: false,
                status,
                payload: serde_json::json!({ "error": message }),
            },
        )
    }

    /// Snapshot of all calls in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Endpoints called so far, in order.
    pub fn endpoints(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|c| c.endpoint).collect()
    }

    /// Number of calls made to `endpoint`.
    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// True if no call has been made.
    pub fn is_untouched(&self) -> bool {
        self.calls.lock().unwrap().is_empty()
    }

    fn respond(&self, endpoint: &'static str, body: Option<serde_json::Value>) -> ApiCallResult {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall { endpoint, body });
        self.responses
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| {
                ApiCallResult::failure(404, ApiError::new("no scripted response", endpoint))
            })
    }
}

fn ok(payload: serde_json::Value) -> ApiCallResult {
    ApiCallResult {
        ok: true,
        status: 200,
        payload,
    }
}

impl AdminApi for MockAdminApi {
    async fn list_keys(&self) -> ApiCallResult {
        self.respond(endpoints::LIST, None)
    }

    async fn add_key(&self) -> ApiCallResult {
        self.respond(endpoints::ADD, None)
    }

    async fn link_key(&self, request: &LinkRequest) -> ApiCallResult {
        self.respond(endpoints::LINK, serde_json::to_value(request).ok())
    }

    async fn reset_devices(&self, request: &ResetDevicesRequest) -> ApiCallResult {
        self.respond(endpoints::RESET_DEVICES, serde_json::to_value(request).ok())
    }
}
