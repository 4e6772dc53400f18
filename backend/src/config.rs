//! File configuration for the pilot.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! working setup. Values of the form `${VAR}` are replaced from the
//! environment before parsing.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::automation::page::{SenderPolicy, SiteVersion};

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable not set: {0}")]
    EnvVarNotSet(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    pub browser: BrowserSection,
    pub completion: CompletionSection,
    pub pacing: PacingSection,
    pub page: PageSection,
    pub server: ServerSection,
    pub settings: SettingsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// Persistent profile directory, so the operator's login survives restarts.
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub inbox_url: String,
    pub extra_args: Vec<String>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            profile_dir: PathBuf::from("./isolated_data/instagram"),
            headless: false,
            inbox_url: "https://www.instagram.com/direct/inbox/".to_string(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSection {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 150,
            timeout_secs: 30,
        }
    }
}

/// Fixed waits around page interactions, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSection {
    pub inbox_navigation_ms: u64,
    pub after_navigation_ms: u64,
    pub chat_open_ms: u64,
    pub input_settle_ms: u64,
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            inbox_navigation_ms: 3000,
            after_navigation_ms: 2000,
            chat_open_ms: 2000,
            input_settle_ms: 800,
        }
    }
}

impl PacingSection {
    pub fn immediate() -> Self {
        Self {
            inbox_navigation_ms: 0,
            after_navigation_ms: 0,
            chat_open_ms: 0,
            input_settle_ms: 0,
        }
    }

    pub fn inbox_navigation(&self) -> Duration {
        Duration::from_millis(self.inbox_navigation_ms)
    }

    pub fn after_navigation(&self) -> Duration {
        Duration::from_millis(self.after_navigation_ms)
    }

    pub fn chat_open(&self) -> Duration {
        Duration::from_millis(self.chat_open_ms)
    }

    pub fn input_settle(&self) -> Duration {
        Duration::from_millis(self.input_settle_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSection {
    pub site_version: SiteVersion,
    pub sender_policy: SenderPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSection {
    pub path: PathBuf,
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./isolated_data/settings.json"),
        }
    }
}

impl PilotConfig {
    /// Load from `path`; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content)?;
        Ok(toml::from_str(&expanded)?)
    }
}

fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = content.to_string();
    for cap in ENV_VAR.captures_iter(content) {
        let name = &cap[1];
        let value = std::env::var(name).map_err(|_| ConfigError::EnvVarNotSet(name.to_string()))?;
        result = result.replace(&cap[0], &value);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = PilotConfig::load_str("").unwrap();
        assert_eq!(config.completion.model, "gpt-3.5-turbo");
        assert_eq!(config.completion.max_tokens, 150);
        assert_eq!(config.pacing.input_settle_ms, 800);
        assert_eq!(config.page.site_version, SiteVersion::Current);
        assert_eq!(config.page.sender_policy, SenderPolicy::Broad);
        assert_eq!(config.server.bind.port(), 8000);
    }

    #[test]
    fn sections_override_individual_fields() {
        let config = PilotConfig::load_str(
            r#"
            [pacing]
            chat_open_ms = 500

            [page]
            site_version = "legacy"
            sender_policy = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(config.pacing.chat_open_ms, 500);
        assert_eq!(config.pacing.after_navigation_ms, 2000);
        assert_eq!(config.page.site_version, SiteVersion::Legacy);
        assert_eq!(config.page.sender_policy, SenderPolicy::Strict);
    }

    #[test]
    fn env_vars_are_expanded() {
        std::env::set_var("INBOX_PILOT_TEST_MODEL", "gpt-4o-mini");
        let config = PilotConfig::load_str(
            r#"
            [completion]
            model = "${INBOX_PILOT_TEST_MODEL}"
            "#,
        )
        .unwrap();
        assert_eq!(config.completion.model, "gpt-4o-mini");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let err = PilotConfig::load_str(r#"model = "${INBOX_PILOT_SURELY_UNSET_VAR}""#).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotSet(name) if name == "INBOX_PILOT_SURELY_UNSET_VAR"));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PilotConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.browser.inbox_url, "https://www.instagram.com/direct/inbox/");
    }
}
