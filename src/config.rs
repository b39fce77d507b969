use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Runtime settings, read from `config.json` under the user's config
/// directory. A missing file or missing fields fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat backend.
    pub backend_url: String,
    /// The real person the bot stands in for.
    pub persona_name: String,
    /// Display name of the bot itself.
    pub bot_name: String,
    /// Seconds to wait for a reply before giving up.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8787".to_string(),
            persona_name: "Doppel".to_string(),
            bot_name: "DoppelGPT".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Caption animated in the chat while a reply is pending.
    pub fn thinking_caption(&self) -> String {
        format!("{} is thinking...", self.bot_name)
    }

    /// Hint shown in the input box before the first message.
    pub fn greeting(&self) -> String {
        format!(
            "Hi, I'm {}. Interview me and I'll answer just like the real {}.",
            self.bot_name, self.persona_name
        )
    }
}

fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
    Ok(config_dir.join("doppel").join("config.json"))
}
