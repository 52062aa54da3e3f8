//! `/generatekey`: self-service key issuance
//!
//! A member gets at most one key: the key list is checked for a key already
//! linked to the invoker before a new one is created and linked. The check
//! and the create/link steps are not atomic, so two concurrent requests from
//! the same member can still both create a key.

#[path = "issuance_tests.rs"]
mod issuance_tests;

use license_admin::{list_key_records, AdminApi};
use license_types::{LinkRequest, NewKey};
use tracing::{error, info, warn};

use crate::access::AccessStore;
use crate::errors::{log_reply_error, CommandError, Rejection};
use crate::reply::{Reply, ReplyEmbed, ReplySink, COLOUR_SUCCESS, COLOUR_WARNING};
use crate::router::Invoker;

const LIST_FAILED: &str = "Could not check the list of keys.";
const CREATE_FAILED: &str = "Error while creating the key.";
const LINK_FAILED: &str = "Error while linking the key.";

/// What happened to an issuance request.
#[derive(Debug)]
pub enum IssuanceOutcome {
    /// Refused before any remote call.
    Rejected(Rejection),
    /// The invoker already had this key; nothing was created.
    AlreadyIssued(String),
    /// A new key was created and linked to the invoker.
    Issued(String),
    /// A remote step failed; later steps were skipped.
    Failed(CommandError),
    /// The deferred acknowledgement could not be sent.
    Undelivered,
}

enum KeyGrant {
    Existing(String),
    New(String),
}

/// Run the issuance workflow for `invoker`.
pub async fn issue_key<A, S, R>(api: &A, store: &S, invoker: &Invoker, sink: &R) -> IssuanceOutcome
where
    A: AdminApi,
    S: AccessStore,
    R: ReplySink,
{
    let settings = match store.load().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to read access config: {}", e);
            return reject(sink, Rejection::ConfigUnavailable).await;
        }
    };

    if let Some(role_id) = settings.allowed_role_id {
        if !settings.permits(&invoker.role_ids) {
            info!(
                "User {} lacks role {} required for /generatekey",
                invoker.user_id, role_id
            );
            return reject(sink, Rejection::MissingAllowedRole(role_id)).await;
        }
    }

    if let Err(e) = sink.defer().await {
        log_reply_error("Failed to defer /generatekey", &e);
        return IssuanceOutcome::Undelivered;
    }

    let (reply, outcome) = match grant_key(api, invoker).await {
        Ok(KeyGrant::Existing(key)) => {
            info!("User {} already has a key", invoker.user_id);
            (
                Reply::Embed(key_embed("⚠️ You already have a key!", COLOUR_WARNING, &key)),
                IssuanceOutcome::AlreadyIssued(key),
            )
        }
        Ok(KeyGrant::New(key)) => {
            info!("Issued a new key to user {}", invoker.user_id);
            (
                Reply::Embed(key_embed("✅ Your key has been generated!", COLOUR_SUCCESS, &key)),
                IssuanceOutcome::Issued(key),
            )
        }
        Err(e) => {
            warn!("Key issuance for user {} failed: {}", invoker.user_id, e);
            (Reply::text(e.user_message()), IssuanceOutcome::Failed(e))
        }
    };

    if let Err(e) = sink.finalize(reply).await {
        log_reply_error("Failed to finalize /generatekey", &e);
    }
    outcome
}

async fn grant_key<A: AdminApi>(api: &A, invoker: &Invoker) -> Result<KeyGrant, CommandError> {
    let keys = list_key_records(api, LIST_FAILED)
        .await
        .map_err(CommandError::remote)?;

    if let Some(existing) = keys.iter().find(|k| k.is_linked_to(invoker.user_id)) {
        return Ok(KeyGrant::Existing(existing.cle_unique.clone()));
    }

    let NewKey { key } = api
        .add_key()
        .await
        .into_outcome(CREATE_FAILED)
        .into_result()
        .map_err(CommandError::remote)?;
    if key.trim().is_empty() {
        return Err(CommandError::Remote(CREATE_FAILED.to_string()));
    }

    let link = LinkRequest {
        key: key.clone(),
        discord_user_id: invoker.user_id.to_string(),
        discord_username: invoker.tag.clone(),
    };
    api.link_key(&link)
        .await
        .into_outcome::<serde_json::Value>(LINK_FAILED)
        .into_result()
        .map_err(|f| {
            // The created key stays unlinked on the remote side.
            warn!("Key created but not linked for user {}", invoker.user_id);
            CommandError::remote(f)
        })?;

    Ok(KeyGrant::New(key))
}

async fn reject<R: ReplySink>(sink: &R, rejection: Rejection) -> IssuanceOutcome {
    if let Err(e) = sink.reject(&rejection.to_string()).await {
        log_reply_error("Failed to reject /generatekey", &e);
    }
    IssuanceOutcome::Rejected(rejection)
}

fn key_embed(title: &str, colour: u32, key: &str) -> ReplyEmbed {
    ReplyEmbed::new(title, colour).field("Your key", format!("```{}```", key))
}
