//! Slash command routing
//!
//! No state is kept between invocations. The event handler builds a
//! [`CommandInvocation`] from the serenity interaction, [`route`] decides
//! where it goes and [`dispatch`] runs the matching workflow.

#[path = "router_tests.rs"]
mod router_tests;

use std::sync::Arc;

use license_admin::{AdminApi, AdminClient};
use serenity::prelude::TypeMapKey;
use tracing::debug;

use crate::access::{AccessStore, FileAccessStore};
use crate::admin::{run_admin, AdminAction};
use crate::commands;
use crate::errors::{log_reply_error, Rejection};
use crate::issuance::issue_key;
use crate::reply::ReplySink;

/// Identity of the member running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: u64,
    /// Display tag sent to the admin API when linking a key
    pub tag: String,
    pub role_ids: Vec<u64>,
    pub role_names: Vec<String>,
}

impl Invoker {
    pub fn has_role_named(&self, name: &str) -> bool {
        self.role_names.iter().any(|r| r == name)
    }
}

/// A resolved option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Role { id: u64, name: String },
    Other,
}

/// An option passed to a sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionInput {
    pub name: String,
    pub value: OptionValue,
}

/// The sub-command selected under a command group such as `/admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcommandInput {
    pub name: String,
    pub options: Vec<OptionInput>,
}

impl SubcommandInput {
    pub fn string(&self, name: &str) -> Option<&str> {
        self.options.iter().find_map(|o| match &o.value {
            OptionValue::String(s) if o.name == name => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn role(&self, name: &str) -> Option<(u64, &str)> {
        self.options.iter().find_map(|o| match &o.value {
            OptionValue::Role { id, name: role_name } if o.name == name => {
                Some((*id, role_name.as_str()))
            }
            _ => None,
        })
    }
}

/// A slash command invocation, independent of serenity types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub name: String,
    pub subcommand: Option<SubcommandInput>,
    pub guild_id: Option<u64>,
    pub invoker: Invoker,
}

/// Where an invocation goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Issued outside a guild; rejected before anything else.
    GuildOnly,
    GenerateKey,
    Admin(AdminAction),
    /// Unknown command or sub-command.
    Ignored,
}

/// Decide where `invocation` goes.
pub fn route(invocation: &CommandInvocation) -> Route {
    if invocation.guild_id.is_none() {
        return Route::GuildOnly;
    }

    match invocation.name.as_str() {
        commands::GENERATE_KEY => Route::GenerateKey,
        commands::ADMIN => invocation
            .subcommand
            .as_ref()
            .and_then(AdminAction::from_subcommand)
            .map(Route::Admin)
            .unwrap_or(Route::Ignored),
        _ => Route::Ignored,
    }
}

/// Long-lived collaborators shared by every invocation.
pub struct BotServices<A, S> {
    pub api: A,
    pub store: S,
    /// Name of the role allowed to run `/admin`
    pub support_role_name: String,
    /// Guild the slash commands are registered in
    pub command_guild_id: Option<u64>,
}

impl TypeMapKey for BotServices<AdminClient, FileAccessStore> {
    type Value = Arc<BotServices<AdminClient, FileAccessStore>>;
}

/// Route `invocation` and run the matching workflow, replying through `sink`.
pub async fn dispatch<A, S, R>(
    services: &BotServices<A, S>,
    invocation: &CommandInvocation,
    sink: &R,
) -> Route
where
    A: AdminApi,
    S: AccessStore,
    R: ReplySink,
{
    let route = route(invocation);
    debug!(
        "Routing /{} from user {} to {:?}",
        invocation.name, invocation.invoker.user_id, route
    );

    match &route {
        Route::GuildOnly => {
            if let Err(e) = sink.reject(&Rejection::GuildOnly.to_string()).await {
                log_reply_error("Failed to reject direct-message command", &e);
            }
        }
        Route::GenerateKey => {
            issue_key(&services.api, &services.store, &invocation.invoker, sink).await;
        }
        Route::Admin(action) => {
            run_admin(
                &services.api,
                &services.store,
                &services.support_role_name,
                &invocation.invoker,
                action,
                sink,
            )
            .await;
        }
        Route::Ignored => {}
    }

    route
}
