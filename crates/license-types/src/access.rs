//! Access configuration for self-service key issuance

use serde::{Deserialize, Serialize};

/// Persisted access settings.
///
/// With no role set, any guild member may request a key. The value is
/// always read and written wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessSettings {
    #[serde(
        rename = "allowedRoleId",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::snowflake::serialize_opt",
        deserialize_with = "crate::snowflake::deserialize_opt"
    )]
    pub allowed_role_id: Option<u64>,
}

impl AccessSettings {
    /// Settings restricting issuance to `role_id`.
    pub fn restricted_to(role_id: u64) -> Self {
        Self {
            allowed_role_id: Some(role_id),
        }
    }

    /// Check whether a member holding `role_ids` may request a key.
    pub fn permits(&self, role_ids: &[u64]) -> bool {
        match self.allowed_role_id {
            None => true,
            Some(required) => role_ids.contains(&required),
        }
    }
}
