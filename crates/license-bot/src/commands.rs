//! Slash command definitions and guild registration

use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::http::Http;
use serenity::model::application::CommandOptionType;
use serenity::model::id::GuildId;
use tracing::info;

pub const GENERATE_KEY: &str = "generatekey";
pub const ADMIN: &str = "admin";

pub const LIST_KEYS: &str = "listkeys";
pub const RESET_DEVICES: &str = "resetdevices";
pub const SET_ROLE: &str = "setrole";

pub const KEY_OPTION: &str = "key";
pub const ROLE_OPTION: &str = "role";

/// Every command the bot answers.
pub fn definitions() -> Vec<CreateCommand> {
    let generate = CreateCommand::new(GENERATE_KEY).description("Generate your unique license key.");

    let admin = CreateCommand::new(ADMIN)
        .description("Staff-only commands.")
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            LIST_KEYS,
            "Show every license key and its user.",
        ))
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                RESET_DEVICES,
                "Reset the devices of a license key.",
            )
            .add_sub_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    KEY_OPTION,
                    "The key to reset (e.g. PROPULSE-...).",
                )
                .required(true),
            ),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                SET_ROLE,
                "Set the role allowed to use /generatekey.",
            )
            .add_sub_option(
                CreateCommandOption::new(
                    CommandOptionType::Role,
                    ROLE_OPTION,
                    "The role that may generate keys.",
                )
                .required(true),
            ),
        );

    vec![generate, admin]
}

/// Replace the guild's commands with [`definitions`].
///
/// `http` must know the application id.
pub async fn register(http: &Http, guild_id: u64) -> serenity::Result<usize> {
    let registered = GuildId::new(guild_id)
        .set_commands(http, definitions())
        .await?;
    info!(
        "Registered {} slash commands in guild {}",
        registered.len(),
        guild_id
    );
    Ok(registered.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn as_json() -> Vec<Value> {
        definitions()
            .iter()
            .map(|c| serde_json::to_value(c).unwrap())
            .collect()
    }

    #[test]
    fn test_generatekey_has_no_options() {
        let cmds = as_json();
        assert_eq!(cmds[0]["name"], GENERATE_KEY);
        let options = cmds[0].get("options").and_then(Value::as_array);
        assert!(options.map_or(true, |o| o.is_empty()));
    }

    #[test]
    fn test_admin_subcommands() {
        let cmds = as_json();
        let admin = &cmds[1];
        assert_eq!(admin["name"], ADMIN);

        let subs = admin["options"].as_array().unwrap();
        let names: Vec<&str> = subs.iter().map(|s| s["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec![LIST_KEYS, RESET_DEVICES, SET_ROLE]);
        assert!(subs.iter().all(|s| s["type"] == 1));

        let key = &subs[1]["options"][0];
        assert_eq!(key["name"], KEY_OPTION);
        assert_eq!(key["type"], 3);
        assert_eq!(key["required"], true);

        let role = &subs[2]["options"][0];
        assert_eq!(role["name"], ROLE_OPTION);
        assert_eq!(role["type"], 8);
        assert_eq!(role["required"], true);
    }
}
