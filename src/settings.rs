//! User settings persistence.
//!
//! Stores agent settings in `~/.polkagent/config.toml`. Settings are loaded
//! with env var > config file > default priority; `AgentConfig` turns the
//! merged result into a validated runtime config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::helpers::optional_env;
use crate::error::ConfigError;

/// Raw, unvalidated agent settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub chain: ChainSettings,
    pub agent: AgentSettings,
    pub proxy: ProxySettings,
}

/// Language-model provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

/// Chain endpoint and signing material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    pub endpoint: Option<String>,
    pub signing_secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Replaces the built-in instruction template sent to the model.
    pub instruction_template: Option<String>,
}

/// Delegation policy applied to proxy add/remove calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub scope: Option<String>,
    pub delay_blocks: Option<u32>,
}

impl Settings {
    /// Default TOML config file path (`~/.polkagent/config.toml`).
    pub fn default_toml_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".polkagent")
            .join("config.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Overlay `other` onto `self`, keeping values that `other` leaves unset.
    pub fn merge_from(&mut self, other: &Self) {
        let default_json = match serde_json::to_value(Self::default()) {
            Ok(v) => v,
            Err(_) => return,
        };
        let other_json = match serde_json::to_value(other) {
            Ok(v) => v,
            Err(_) => return,
        };
        let mut self_json = match serde_json::to_value(&*self) {
            Ok(v) => v,
            Err(_) => return,
        };

        merge_non_default(&mut self_json, &other_json, &default_json);

        if let Ok(merged) = serde_json::from_value(self_json) {
            *self = merged;
        }
    }

    /// Apply environment variable overrides on top of file settings.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = optional_env("LLM_API_KEY")? {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = optional_env("LLM_BASE_URL")? {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = optional_env("LLM_MODEL")? {
            self.llm.model = Some(v);
        }
        if let Some(v) = optional_env("LLM_TEMPERATURE")? {
            let parsed = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: "LLM_TEMPERATURE".to_string(),
                message: format!("must be a number: {e}"),
            })?;
            self.llm.temperature = Some(parsed);
        }
        if let Some(v) = optional_env("LLM_TIMEOUT_SECS")? {
            let parsed = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: "LLM_TIMEOUT_SECS".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?;
            self.llm.timeout_secs = Some(parsed);
        }
        if let Some(v) = optional_env("CHAIN_ENDPOINT")? {
            self.chain.endpoint = Some(v);
        }
        if let Some(v) = optional_env("SIGNING_SECRET")? {
            self.chain.signing_secret = Some(v);
        }
        if let Some(v) = optional_env("AGENT_INSTRUCTION_TEMPLATE")? {
            self.agent.instruction_template = Some(v);
        }
        if let Some(v) = optional_env("PROXY_SCOPE")? {
            self.proxy.scope = Some(v);
        }
        if let Some(v) = optional_env("PROXY_DELAY_BLOCKS")? {
            let parsed = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: "PROXY_DELAY_BLOCKS".to_string(),
                message: format!("must be a non-negative integer: {e}"),
            })?;
            self.proxy.delay_blocks = Some(parsed);
        }
        Ok(())
    }
}

fn merge_non_default(
    target: &mut serde_json::Value,
    other: &serde_json::Value,
    defaults: &serde_json::Value,
) {
    match (target, other, defaults) {
        (
            serde_json::Value::Object(t),
            serde_json::Value::Object(o),
            serde_json::Value::Object(d),
        ) => {
            for (key, other_val) in o {
                let default_val = d.get(key).cloned().unwrap_or(serde_json::Value::Null);
                if let Some(target_val) = t.get_mut(key) {
                    merge_non_default(target_val, other_val, &default_val);
                } else if other_val != &default_val {
                    t.insert(key.clone(), other_val.clone());
                }
            }
        }
        (target, other, defaults) => {
            if other != defaults {
                *target = other.clone();
            }
        }
    }
}
