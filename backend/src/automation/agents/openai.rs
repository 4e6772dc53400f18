use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::protocol::{AgentResult, GenerationError, ReplyGenerator, SYSTEM_PROMPT};
use crate::config::CompletionSection;
use crate::models::{ConversationTurn, Role};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completion client for OpenAI-compatible endpoints.
pub struct OpenAiGenerator {
    http_client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, settings: &CompletionSection) -> AgentResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self::with_client(http_client, api_key, settings))
    }

    pub fn with_client(http_client: Client, api_key: impl Into<String>, settings: &CompletionSection) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    fn request<'a>(&'a self, conversation: &'a [ConversationTurn]) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(RequestMessage { role: Role::System, content: SYSTEM_PROMPT });
        messages.extend(conversation.iter().map(|turn| RequestMessage {
            role: turn.role,
            content: &turn.content,
        }));
        CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiGenerator {
    async fn generate(&self, conversation: &[ConversationTurn]) -> AgentResult<String> {
        debug!(turns = conversation.len(), model = %self.model, "requesting completion");
        let resp = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(conversation))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "completion API error");
            return Err(GenerationError::Status { status: status.as_u16(), body });
        }

        let body = resp.text().await?;
        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::Malformed("no choices".into()))?
            .message
            .content
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(content)
    }
}
