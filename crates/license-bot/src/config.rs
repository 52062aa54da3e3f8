//! Configuration management for license-bot

#[path = "config_tests.rs"]
mod config_tests;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use license_admin::AdminClientConfig;
use serde::{Deserialize, Serialize};

/// Default location of the persisted access settings.
pub const DEFAULT_ACCESS_CONFIG_PATH: &str = "config.json";

/// Source of environment variables.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordSettings,
    pub admin_api: AdminApiSettings,
    #[serde(default)]
    pub access: AccessStoreSettings,
}

/// Discord connection and command settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordSettings {
    /// Bot token from the Discord developer portal
    #[serde(default = "default_bot_token")]
    pub bot_token: String,
    /// Application id, needed to register commands without a gateway session
    #[serde(default)]
    pub application_id: Option<u64>,
    /// Guild the slash commands are registered in
    #[serde(default)]
    pub guild_id: Option<u64>,
    /// Name of the role allowed to run `/admin`
    pub support_role_name: String,
}

/// Remote admin API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminApiSettings {
    pub server_url: String,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Request timeout in seconds. Unset means no local timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Where the access settings are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessStoreSettings {
    #[serde(default = "default_access_path")]
    pub path: PathBuf,
}

impl Default for AccessStoreSettings {
    fn default() -> Self {
        Self {
            path: default_access_path(),
        }
    }
}

impl AdminApiSettings {
    pub fn client_config(&self) -> AdminClientConfig {
        AdminClientConfig {
            base_url: self.server_url.clone(),
            secret_key: self.secret_key.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_impl(&SystemEnv)
    }

    pub(crate) fn from_env_impl<E: ReadEnv>(env: &E) -> Result<Self> {
        let bot_token = env.var("DISCORD_TOKEN").context("DISCORD_TOKEN not set")?;
        let server_url = env.var("SERVER_URL").context("SERVER_URL not set")?;
        let secret_key = env
            .var("ADMIN_SECRET_KEY")
            .context("ADMIN_SECRET_KEY not set")?;
        let support_role_name = env
            .var("SUPPORT_ROLE_NAME")
            .context("SUPPORT_ROLE_NAME not set")?;

        let application_id = parse_id(env, "CLIENT_ID")?;
        let guild_id = parse_id(env, "GUILD_ID")?;

        let timeout_secs = match env.var("ADMIN_API_TIMEOUT_SECS") {
            Some(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse::<u64>()
                    .with_context(|| format!("ADMIN_API_TIMEOUT_SECS is not a number: {}", v))?,
            ),
            _ => None,
        };

        let path = env
            .var("ACCESS_CONFIG_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_access_path);

        Ok(Config {
            discord: DiscordSettings {
                bot_token,
                application_id,
                guild_id,
                support_role_name,
            },
            admin_api: AdminApiSettings {
                server_url,
                secret_key,
                timeout_secs,
            },
            access: AccessStoreSettings { path },
        })
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            bail!("Discord bot token is empty");
        }
        if self.discord.support_role_name.trim().is_empty() {
            bail!("Support role name is empty");
        }
        if self.admin_api.server_url.trim().is_empty() {
            bail!("Admin API server URL is empty");
        }
        if self.admin_api.secret_key.is_empty() {
            bail!("Admin API secret key is empty");
        }
        Ok(())
    }
}

fn parse_id<E: ReadEnv>(env: &E, key: &str) -> Result<Option<u64>> {
    match env.var(key) {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{} is not a valid id: {}", key, v)),
        _ => Ok(None),
    }
}

fn default_bot_token() -> String {
    std::env::var("DISCORD_TOKEN").unwrap_or_default()
}

fn default_secret_key() -> String {
    std::env::var("ADMIN_SECRET_KEY").unwrap_or_default()
}

fn default_access_path() -> PathBuf {
    PathBuf::from(DEFAULT_ACCESS_CONFIG_PATH)
}
