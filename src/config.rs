use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::gemini::{self, GeminiSettings};
use crate::pipeline::Strategy;

/// Environment variables checked, in order, for the Gemini credential
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub model: Option<String>,
    pub strategies: Option<Vec<Strategy>>,
    pub timeout_secs: Option<u64>,
    pub listen: Option<String>,
    pub gemini_base_url: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytinsight/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Per-call timeout for every upstream request, clamped to 1..=120s
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).clamp(1, 120))
    }

    pub fn listen(&self) -> &str {
        self.listen.as_deref().unwrap_or(DEFAULT_LISTEN)
    }

    pub fn strategies(&self) -> Vec<Strategy> {
        self.strategies
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(Strategy::default_ranking)
    }

    /// Resolve Gemini settings, reading the credential through `lookup`
    pub fn gemini_settings<F>(&self, model: Option<&str>, lookup: F) -> crate::Result<GeminiSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|var| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
            .ok_or_else(|| Error::ApiKeyMissing(API_KEY_VARS.join(" or ")))?;

        Ok(GeminiSettings {
            api_key,
            model: model
                .or(self.model.as_deref())
                .unwrap_or(gemini::DEFAULT_MODEL)
                .to_string(),
            base_url: self
                .gemini_base_url
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),
            timeout: self.timeout(),
        })
    }
}

/// Credential lookup against the process environment
pub fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytinsight")
        .join("config.toml")
}
