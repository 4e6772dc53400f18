use serde::{Deserialize, Serialize};

use crate::error::{PilotError, PilotResult};

pub const DEFAULT_DELAY_MS: u64 = 2000;
pub const DEFAULT_MESSAGE_WINDOW: usize = 20;

const MASK_TAIL: usize = 4;

/// Parameters of a single run. Fixed once the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    api_key: String,
    delay_ms: u64,
    message_window: usize,
}

impl RunConfig {
    pub fn new(api_key: impl Into<String>, delay_ms: u64, message_window: usize) -> PilotResult<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(PilotError::InvalidRunConfig("API key is empty".into()));
        }
        if message_window == 0 {
            return Err(PilotError::InvalidRunConfig("message window must be at least 1".into()));
        }
        Ok(Self { api_key, delay_ms, message_window })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn message_window(&self) -> usize {
        self.message_window
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: u32,
    pub responded: u32,
    pub skipped: u32,
}

impl RunStats {
    pub fn record_responded(&mut self) {
        self.responded += 1;
        self.processed += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
        self.processed += 1;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Stopped,
    Completed,
}

impl RunPhase {
    pub fn is_active(self) -> bool {
        self == RunPhase::Running
    }
}

/// Progress notifications emitted by a run, in the order they happen.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatusEvent {
    Stats { stats: RunStats },
    CurrentChat { name: String, status: String },
    Alert { message: String },
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatStatus {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub phase: RunPhase,
    pub stats: RunStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_chat: Option<ChatStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Operator settings kept between sessions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_delay")]
    pub delay: u64,
    #[serde(default = "default_message_count")]
    pub message_count: usize,
}

fn default_delay() -> u64 {
    DEFAULT_DELAY_MS
}

fn default_message_count() -> usize {
    DEFAULT_MESSAGE_WINDOW
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            delay: DEFAULT_DELAY_MS,
            message_count: DEFAULT_MESSAGE_WINDOW,
        }
    }
}

impl Settings {
    pub fn run_config(&self) -> PilotResult<RunConfig> {
        let key = self.api_key.as_deref().unwrap_or_default();
        RunConfig::new(key, self.delay, self.message_count)
    }

    /// Copy with the API key reduced to its last four characters. Keys that
    /// short are hidden entirely.
    pub fn masked(&self) -> Self {
        let api_key = self.api_key.as_ref().map(|key| {
            let len = key.chars().count();
            if len <= MASK_TAIL {
                return "****".to_string();
            }
            let tail: String = key.chars().skip(len - MASK_TAIL).collect();
            format!("****{}", tail)
        });
        Self { api_key, ..self.clone() }
    }
}
