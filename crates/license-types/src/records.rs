//! License key records and request bodies of the remote admin API

use serde::{Deserialize, Serialize};

/// Maximum number of devices a single key may be bound to.
pub const MAX_DEVICES: usize = 2;

/// A license key as returned by `GET /admin/list`.
///
/// Field names follow the remote service's wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KeyRecord {
    pub cle_unique: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::snowflake::deserialize_opt_string"
    )]
    pub discord_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_username: Option<String>,
    /// JSON-encoded array of device identifiers. Some deployments send the
    /// array itself instead of its string encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appareils_actifs: Option<serde_json::Value>,
}

impl KeyRecord {
    /// True when the key is linked to some requester.
    pub fn is_linked(&self) -> bool {
        self.discord_user_id.is_some()
    }

    /// True when the key is linked to `user_id`.
    pub fn is_linked_to(&self, user_id: u64) -> bool {
        self.discord_user_id
            .as_deref()
            .and_then(|id| id.trim().parse::<u64>().ok())
            == Some(user_id)
    }

    /// Decoded list of active device identifiers.
    ///
    /// Missing, empty and malformed values all decode as no devices.
    pub fn active_devices(&self) -> Vec<String> {
        let value = match &self.appareils_actifs {
            Some(serde_json::Value::String(encoded)) if encoded.trim().is_empty() => return vec![],
            Some(serde_json::Value::String(encoded)) => {
                match serde_json::from_str::<serde_json::Value>(encoded) {
                    Ok(v) => v,
                    Err(_) => return vec![],
                }
            }
            Some(v) => v.clone(),
            None => return vec![],
        };

        match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Number of devices currently bound to this key.
    pub fn device_count(&self) -> usize {
        self.active_devices().len()
    }
}

/// Response body of `POST /admin/add`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewKey {
    pub key: String,
}

/// Body of `POST /admin/link`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub key: String,
    pub discord_user_id: String,
    pub discord_username: String,
}

/// Body of `POST /admin/reset_devices`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResetDevicesRequest {
    pub key: String,
}
