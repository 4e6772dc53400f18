use async_trait::async_trait;
use thiserror::Error;

use crate::models::ConversationTurn;

pub const SYSTEM_PROMPT: &str = "You are a helpful and friendly assistant responding to Instagram direct messages. Keep responses natural, casual, and concise. Match the tone of the conversation.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("completion was empty")]
    Empty,
}

pub type AgentResult<T> = Result<T, GenerationError>;

/// Produces the next outgoing message for a conversation.
///
/// Any error means "no reply": the caller skips the chat and does not retry.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, conversation: &[ConversationTurn]) -> AgentResult<String>;
}
