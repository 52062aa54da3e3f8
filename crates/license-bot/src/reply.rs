//! Replies to a slash command invocation
//!
//! Workflows talk to the invoking user only through [`ReplySink`]: an
//! immediate ephemeral rejection, or a deferred acknowledgement later
//! finalized with the real content.

use std::sync::Arc;

use serenity::builder::{
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
    EditInteractionResponse,
};
use serenity::http::Http;
use serenity::model::application::CommandInteraction;
use thiserror::Error;

pub const COLOUR_SUCCESS: u32 = 0x28a745;
pub const COLOUR_WARNING: u32 = 0xffc107;
pub const COLOUR_INFO: u32 = 0x0d6efd;

/// Errors raised while delivering a reply.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),
}

/// An embed, independent of the Discord builder types.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyEmbed {
    pub title: String,
    pub colour: u32,
    pub description: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl ReplyEmbed {
    pub fn new(title: impl Into<String>, colour: u32) -> Self {
        Self {
            title: title.into(),
            colour,
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    fn to_builder(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new().title(&self.title).colour(self.colour);
        if let Some(description) = &self.description {
            embed = embed.description(description);
        }
        for (name, value) in &self.fields {
            embed = embed.field(name, value, false);
        }
        embed
    }
}

/// Final content of a deferred reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Embed(ReplyEmbed),
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Reply::Text(content.into())
    }
}

/// Where a workflow sends its replies.
#[allow(async_fn_in_trait)]
pub trait ReplySink {
    /// Answer immediately with an ephemeral message. Ends the interaction.
    async fn reject(&self, content: &str) -> Result<(), ReplyError>;

    /// Acknowledge now with an ephemeral "thinking" state.
    async fn defer(&self) -> Result<(), ReplyError>;

    /// Replace the deferred acknowledgement with `reply`.
    async fn finalize(&self, reply: Reply) -> Result<(), ReplyError>;
}

/// Replies to a serenity [`CommandInteraction`] over the HTTP API.
pub struct InteractionReplySink {
    http: Arc<Http>,
    interaction: CommandInteraction,
}

impl InteractionReplySink {
    pub fn new(http: Arc<Http>, interaction: CommandInteraction) -> Self {
        Self { http, interaction }
    }
}

impl ReplySink for InteractionReplySink {
    async fn reject(&self, content: &str) -> Result<(), ReplyError> {
        let message = CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true);
        self.interaction
            .create_response(&*self.http, CreateInteractionResponse::Message(message))
            .await?;
        Ok(())
    }

    async fn defer(&self) -> Result<(), ReplyError> {
        self.interaction.defer_ephemeral(&*self.http).await?;
        Ok(())
    }

    async fn finalize(&self, reply: Reply) -> Result<(), ReplyError> {
        let builder = match &reply {
            Reply::Text(content) => EditInteractionResponse::new().content(content),
            Reply::Embed(embed) => EditInteractionResponse::new().embed(embed.to_builder()),
        };
        self.interaction
            .edit_response(&*self.http, builder)
            .await?;
        Ok(())
    }
}
