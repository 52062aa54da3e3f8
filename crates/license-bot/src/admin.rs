//! `/admin`: staff-only key administration

#[path = "admin_tests.rs"]
mod admin_tests;

use license_admin::{list_key_records, AdminApi};
use license_types::{AccessSettings, KeyRecord, ResetDevicesRequest, MAX_DEVICES};
use tracing::{error, info, warn};

use crate::access::AccessStore;
use crate::commands;
use crate::errors::{log_api_failure, log_reply_error, CommandError, Rejection};
use crate::reply::{Reply, ReplyEmbed, ReplySink, COLOUR_INFO};
use crate::router::{Invoker, SubcommandInput};

/// Longest description Discord accepts in an embed.
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

const LIST_FAILED: &str = "Could not fetch the key list.";
const RESET_FAILED: &str = "Key not found or server error.";

/// A parsed `/admin` sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    ListKeys,
    ResetDevices { key: String },
    SetRole { role_id: u64, role_name: String },
}

impl AdminAction {
    /// Parse a sub-command. Unknown names and missing required options give `None`.
    pub fn from_subcommand(sub: &SubcommandInput) -> Option<Self> {
        match sub.name.as_str() {
            commands::LIST_KEYS => Some(AdminAction::ListKeys),
            commands::RESET_DEVICES => {
                let key = sub.string(commands::KEY_OPTION)?.trim();
                if key.is_empty() {
                    return None;
                }
                Some(AdminAction::ResetDevices {
                    key: key.to_string(),
                })
            }
            commands::SET_ROLE => {
                let (role_id, role_name) = sub.role(commands::ROLE_OPTION)?;
                Some(AdminAction::SetRole {
                    role_id,
                    role_name: role_name.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// What happened to an admin request.
#[derive(Debug)]
pub enum AdminOutcome {
    Rejected(Rejection),
    Completed,
    Failed(CommandError),
    Undelivered,
}

/// Run `action` for `invoker` once they are confirmed as support staff.
pub async fn run_admin<A, S, R>(
    api: &A,
    store: &S,
    support_role_name: &str,
    invoker: &Invoker,
    action: &AdminAction,
    sink: &R,
) -> AdminOutcome
where
    A: AdminApi,
    S: AccessStore,
    R: ReplySink,
{
    if !invoker.has_role_named(support_role_name) {
        info!(
            "User {} without role '{}' tried /admin",
            invoker.user_id, support_role_name
        );
        let rejection = Rejection::MissingSupportRole;
        if let Err(e) = sink.reject(&rejection.to_string()).await {
            log_reply_error("Failed to reject /admin", &e);
        }
        return AdminOutcome::Rejected(rejection);
    }

    if let Err(e) = sink.defer().await {
        log_reply_error("Failed to defer /admin", &e);
        return AdminOutcome::Undelivered;
    }

    let result = match action {
        AdminAction::ListKeys => list_keys(api).await,
        AdminAction::ResetDevices { key } => reset_devices(api, key).await,
        AdminAction::SetRole { role_id, role_name } => set_role(store, *role_id, role_name).await,
    };

    let (reply, outcome) = match result {
        Ok(reply) => (reply, AdminOutcome::Completed),
        Err(e) => {
            warn!("/admin {:?} by user {} failed: {}", action, invoker.user_id, e);
            (Reply::text(e.user_message()), AdminOutcome::Failed(e))
        }
    };

    if let Err(e) = sink.finalize(reply).await {
        log_reply_error("Failed to finalize /admin", &e);
    }
    outcome
}

async fn list_keys<A: AdminApi>(api: &A) -> Result<Reply, CommandError> {
    // The remote message is logged but not shown for this sub-command.
    let keys = list_key_records(api, LIST_FAILED)
        .await
        .map_err(|f| {
            log_api_failure(&f);
            CommandError::Remote(LIST_FAILED.to_string())
        })?;

    Ok(render_key_list(&keys))
}

async fn reset_devices<A: AdminApi>(api: &A, key: &str) -> Result<Reply, CommandError> {
    let request = ResetDevicesRequest {
        key: key.to_string(),
    };
    api.reset_devices(&request)
        .await
        .into_outcome::<serde_json::Value>(RESET_FAILED)
        .into_result()
        .map_err(CommandError::remote)?;

    info!("Devices reset for a key");
    Ok(Reply::text(format!(
        "✅ Devices for key `{}` have been reset.",
        key
    )))
}

async fn set_role<S: AccessStore>(
    store: &S,
    role_id: u64,
    role_name: &str,
) -> Result<Reply, CommandError> {
    store
        .save(&AccessSettings::restricted_to(role_id))
        .await
        .map_err(|e| {
            error!("Failed to save access config: {}", e);
            CommandError::ConfigSave(e)
        })?;

    info!("/generatekey restricted to role {} ({})", role_name, role_id);
    Ok(Reply::text(format!(
        "✅ Only members with the role **{}** can now use `/generatekey`.",
        role_name
    )))
}

/// Render the key list as a single reply.
pub fn render_key_list(keys: &[KeyRecord]) -> Reply {
    if keys.is_empty() {
        return Reply::text("No keys have been issued.");
    }

    let blocks: Vec<String> = keys.iter().map(render_key).collect();
    let description = fit_description(&blocks, EMBED_DESCRIPTION_LIMIT);

    Reply::Embed(
        ReplyEmbed::new(format!("🔑 License keys ({})", keys.len()), COLOUR_INFO)
            .description(description),
    )
}

fn render_key(record: &KeyRecord) -> String {
    let user = match (&record.discord_username, &record.discord_user_id) {
        (Some(name), Some(id)) => format!("{} (<@{}>)", name, id),
        (None, Some(id)) => format!("<@{}>", id),
        (Some(name), None) => name.clone(),
        (None, None) => "Unlinked".to_string(),
    };
    format!(
        "**Key**: `{}`\n**User**: {}\n**Devices**: {} / {}",
        record.cle_unique,
        user,
        record.device_count(),
        MAX_DEVICES
    )
}

/// Join `blocks` with blank lines, dropping trailing blocks that do not fit
/// in `limit` characters and noting how many were left out.
fn fit_description(blocks: &[String], limit: usize) -> String {
    const SEPARATOR: &str = "\n\n";

    let mut out = String::new();
    let mut used = 0;

    for (i, block) in blocks.iter().enumerate() {
        let separator = if out.is_empty() { "" } else { SEPARATOR };
        let remaining = blocks.len() - i;
        let block_len = block.chars().count();

        let reserve = if remaining == 1 {
            0
        } else {
            SEPARATOR.len() + more_notice(remaining).chars().count()
        };
        if used + separator.len() + block_len + reserve > limit {
            let notice = more_notice(remaining);
            if used + separator.len() + notice.chars().count() <= limit {
                out.push_str(separator);
                out.push_str(&notice);
            }
            return out;
        }

        out.push_str(separator);
        out.push_str(block);
        used += separator.len() + block_len;
    }

    out
}

fn more_notice(count: usize) -> String {
    format!("… and {} more", count)
}
