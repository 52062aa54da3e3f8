//! Paths of the remote admin API, relative to the configured base URL

pub const LIST: &str = "/admin/list";
pub const ADD: &str = "/admin/add";
pub const LINK: &str = "/admin/link";
pub const RESET_DEVICES: &str = "/admin/reset_devices";

/// Header carrying the shared admin secret.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
