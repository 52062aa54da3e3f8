//! Serenity event handler implementation

use license_admin::AdminClient;
use serenity::async_trait;
use serenity::model::application::{
    CommandInteraction, CommandType, Interaction, ResolvedOption, ResolvedValue,
};
use serenity::model::gateway::Ready;
use serenity::model::id::{GuildId, RoleId};
use serenity::prelude::*;
use tracing::{debug, error, info, warn};

use crate::access::FileAccessStore;
use crate::commands;
use crate::health::AppState;
use crate::reply::InteractionReplySink;
use crate::router::{
    self, BotServices, CommandInvocation, Invoker, OptionInput, OptionValue, SubcommandInput,
};

type Services = BotServices<AdminClient, FileAccessStore>;

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {}#{:04}",
            ready.user.name,
            ready.user.discriminator.map_or(0, |d| d.get())
        );

        let (services, health) = {
            let data = ctx.data.read().await;
            (data.get::<Services>().cloned(), data.get::<AppState>().cloned())
        };

        if let Some(health) = health {
            health.set_bot_username(ready.user.name.clone()).await;
        }

        let Some(services) = services else {
            error!("BotServices not found in context data");
            return;
        };

        match services.command_guild_id {
            Some(guild_id) => {
                if let Err(e) = commands::register(&ctx.http, guild_id).await {
                    error!("Failed to register slash commands in guild {}: {}", guild_id, e);
                }
            }
            None => warn!("No guild configured, slash command registration skipped"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(cmd) = interaction else {
            return;
        };
        if cmd.data.kind != CommandType::ChatInput {
            return;
        }

        let (services, health) = {
            let data = ctx.data.read().await;
            match data.get::<Services>() {
                Some(s) => (s.clone(), data.get::<AppState>().cloned()),
                None => {
                    error!("BotServices not found in context data");
                    return;
                }
            }
        };

        if let Some(health) = health {
            health.record_command();
        }

        let invocation = build_invocation(&ctx, &cmd).await;
        let sink = InteractionReplySink::new(ctx.http.clone(), cmd);
        router::dispatch(services.as_ref(), &invocation, &sink).await;
    }
}

/// Convert a serenity command interaction into a [`CommandInvocation`].
async fn build_invocation(ctx: &Context, cmd: &CommandInteraction) -> CommandInvocation {
    let subcommand = cmd.data.options().iter().find_map(|opt| match &opt.value {
        ResolvedValue::SubCommand(sub_options) => Some(SubcommandInput {
            name: opt.name.to_string(),
            options: sub_options.iter().map(convert_option).collect(),
        }),
        _ => None,
    });

    let role_ids: Vec<RoleId> = cmd
        .member
        .as_ref()
        .map(|m| m.roles.clone())
        .unwrap_or_default();

    // Role names only gate `/admin`.
    let role_names = match cmd.guild_id {
        Some(guild_id) if cmd.data.name == commands::ADMIN => {
            resolve_role_names(ctx, guild_id, &role_ids).await
        }
        _ => Vec::new(),
    };

    CommandInvocation {
        name: cmd.data.name.clone(),
        subcommand,
        guild_id: cmd.guild_id.map(|g| g.get()),
        invoker: Invoker {
            user_id: cmd.user.id.get(),
            tag: cmd.user.tag(),
            role_ids: role_ids.iter().map(|r| r.get()).collect(),
            role_names,
        },
    }
}

fn convert_option(opt: &ResolvedOption<'_>) -> OptionInput {
    let value = match &opt.value {
        ResolvedValue::String(s) => OptionValue::String(s.to_string()),
        ResolvedValue::Role(r) => OptionValue::Role {
            id: r.id.get(),
            name: r.name.clone(),
        },
        _ => OptionValue::Other,
    };
    OptionInput {
        name: opt.name.to_string(),
        value,
    }
}

/// Names of `role_ids` in `guild_id`, from the cache or else the HTTP API.
async fn resolve_role_names(ctx: &Context, guild_id: GuildId, role_ids: &[RoleId]) -> Vec<String> {
    if role_ids.is_empty() {
        return Vec::new();
    }

    let cached: Option<Vec<String>> = ctx.cache.guild(guild_id).map(|guild| {
        role_ids
            .iter()
            .filter_map(|id| guild.roles.get(id).map(|r| r.name.clone()))
            .collect()
    });
    if let Some(names) = cached {
        return names;
    }

    debug!("Guild {} not cached, fetching roles", guild_id);
    match guild_id.roles(&ctx.http).await {
        Ok(roles) => role_ids
            .iter()
            .filter_map(|id| roles.get(id).map(|r| r.name.clone()))
            .collect(),
        Err(e) => {
            warn!("Failed to fetch roles of guild {}: {}", guild_id, e);
            Vec::new()
        }
    }
}
