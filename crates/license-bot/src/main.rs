//! License key bot
//!
//! Answers Discord slash commands by calling the remote license admin API:
//! `/generatekey` issues one key per member and `/admin` lets support staff
//! list keys, reset devices and restrict who may generate keys.

mod access;
mod admin;
mod commands;
mod config;
mod errors;
mod handlers;
mod health;
mod issuance;
mod reply;
mod router;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use license_admin::AdminClient;
use serenity::http::Http;
use serenity::model::gateway::GatewayIntents;
use serenity::model::id::ApplicationId;
use serenity::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::access::FileAccessStore;
use crate::config::Config;
use crate::handlers::Handler;
use crate::health::AppState;
use crate::router::BotServices;

/// License key bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/license-bot.toml")]
    config: String,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_TOKEN")]
    bot_token: Option<String>,

    /// Admin API base URL (overrides config file)
    #[arg(long, env = "SERVER_URL")]
    server_url: Option<String>,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3001")]
    health_port: u16,

    /// Register the slash commands in the configured guild and exit
    #[arg(long)]
    register_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "license_bot=debug,license_admin=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting license bot");

    let args = Args::parse();
    let config = load_config(&args)?;
    config.validate()?;

    if args.register_only {
        return register_only(&config).await;
    }

    let api = AdminClient::new(config.admin_api.client_config())
        .context("Failed to build admin API client")?;
    info!("Admin API: {}", api.base_url());
    let store = FileAccessStore::new(config.access.path.clone());
    info!("Access config: {}", store.path().display());

    let services = Arc::new(BotServices {
        api,
        store,
        support_role_name: config.discord.support_role_name.clone(),
        command_guild_id: config.discord.guild_id,
    });

    // Slash commands carry member roles without privileged intents.
    let intents = GatewayIntents::GUILDS;

    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(Handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))?;

    let health_state = AppState::new();

    {
        let mut data = client.data.write().await;
        data.insert::<BotServices<AdminClient, FileAccessStore>>(services);
        data.insert::<AppState>(health_state.clone());
    }

    let health_port = args.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state, health_port).await {
            error!("Health server error: {}", e);
        }
    });

    // Graceful shutdown: close all shards on SIGTERM or Ctrl+C.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("Shutdown signal received, stopping Discord client...");
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord gateway connection...");

    client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Discord client error: {}", e))?;

    info!("License bot stopped");
    Ok(())
}

/// Load from the config file when present, else from the environment, then
/// apply command-line overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, loading from environment");
        Config::from_env()?
    };

    if let Some(bot_token) = &args.bot_token {
        config.discord.bot_token = bot_token.clone();
    }
    if let Some(server_url) = &args.server_url {
        config.admin_api.server_url = server_url.clone();
    }

    Ok(config)
}

/// Register the slash commands over HTTP without opening a gateway session.
async fn register_only(config: &Config) -> Result<()> {
    let guild_id = config
        .discord
        .guild_id
        .context("A guild id (GUILD_ID) is required to register commands")?;

    let http = Http::new(&config.discord.bot_token);
    let application_id = match config.discord.application_id {
        Some(id) => ApplicationId::new(id),
        None => {
            http.get_current_application_info()
                .await
                .context("Failed to fetch application info")?
                .id
        }
    };
    http.set_application_id(application_id);

    commands::register(&http, guild_id)
        .await
        .with_context(|| format!("Failed to register commands in guild {}", guild_id))?;
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
