//! Configuration for polkagent.
//!
//! Settings are loaded with priority: env var > TOML config file > default.
//! Bootstrap env vars may also live in `~/.polkagent/.env` (loaded via
//! dotenvy early in startup).

pub(crate) mod helpers;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::chain::{ProxyPolicy, ProxyScope};
use crate::error::ConfigError;
use crate::settings::Settings;

use self::helpers::non_blank;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const ENDPOINT_SCHEMES: &[&str] = &["ws", "wss", "http", "https"];

/// Language-model settings resolved for the intent parser.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

/// Validated, immutable agent configuration.
///
/// Only [`AgentConfig::from_settings`] and the env loaders build one, so
/// every required field has been checked by the time an agent sees it.
///
/// ```compile_fail
/// use polkagent::config::AgentConfig;
/// fn blank(config: &mut AgentConfig) {
///     config.chain_endpoint = String::new();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AgentConfig {
    llm: LlmConfig,
    chain_endpoint: String,
    signing_secret: SecretString,
    instruction_template: Option<String>,
    proxy_policy: ProxyPolicy,
}

fn required(value: Option<&str>, key: &str, hint: &str) -> Result<String, ConfigError> {
    non_blank(value).ok_or_else(|| ConfigError::MissingRequired {
        key: key.to_string(),
        hint: hint.to_string(),
    })
}

pub(crate) fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
        key: "CHAIN_ENDPOINT".to_string(),
        message: format!("URL parse failed: {e}"),
    })?;

    let scheme = parsed.scheme().to_ascii_lowercase();
    if !ENDPOINT_SCHEMES.contains(&scheme.as_str()) {
        return Err(ConfigError::InvalidValue {
            key: "CHAIN_ENDPOINT".to_string(),
            message: format!(
                "scheme '{}' is not allowed (allowed: {})",
                scheme,
                ENDPOINT_SCHEMES.join(", ")
            ),
        });
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidValue {
            key: "CHAIN_ENDPOINT".to_string(),
            message: "URL is missing host".to_string(),
        });
    }
    Ok(())
}

impl AgentConfig {
    pub fn llm(&self) -> &LlmConfig {
        &self.llm
    }

    pub fn chain_endpoint(&self) -> &str {
        &self.chain_endpoint
    }

    pub fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    /// Custom instruction template; `None` selects the built-in one.
    pub fn instruction_template(&self) -> Option<&str> {
        self.instruction_template.as_deref()
    }

    pub fn proxy_policy(&self) -> ProxyPolicy {
        self.proxy_policy
    }

    /// Validate raw settings into a runtime config.
    ///
    /// Fails on the first missing required field, before any network or key
    /// material is touched.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let api_key = required(
            settings.llm.api_key.as_deref(),
            "LLM_API_KEY",
            "Set the language-model API key (env LLM_API_KEY or [llm] api_key).",
        )?;
        let chain_endpoint = required(
            settings.chain.endpoint.as_deref(),
            "CHAIN_ENDPOINT",
            "Set the chain RPC endpoint (env CHAIN_ENDPOINT or [chain] endpoint).",
        )?;
        let signing_secret = required(
            settings.chain.signing_secret.as_deref(),
            "SIGNING_SECRET",
            "Set the signing secret (env SIGNING_SECRET or [chain] signing_secret).",
        )?;
        validate_endpoint(&chain_endpoint)?;

        let temperature = settings.llm.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TEMPERATURE".to_string(),
                message: format!("must be between 0.0 and 2.0, got {temperature}"),
            });
        }

        let timeout_secs = settings
            .llm
            .timeout_secs
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let scope = match non_blank(settings.proxy.scope.as_deref()) {
            Some(raw) => ProxyScope::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "PROXY_SCOPE".to_string(),
                message: format!(
                    "unknown proxy scope '{}' (expected one of: {})",
                    raw,
                    ProxyScope::ALL
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })?,
            None => ProxyScope::Any,
        };

        Ok(Self {
            llm: LlmConfig {
                api_key: SecretString::from(api_key),
                base_url: non_blank(settings.llm.base_url.as_deref())
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                model: non_blank(settings.llm.model.as_deref())
                    .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                temperature,
                timeout: Duration::from_secs(timeout_secs),
            },
            chain_endpoint,
            signing_secret: SecretString::from(signing_secret),
            instruction_template: non_blank(settings.agent.instruction_template.as_deref()),
            proxy_policy: ProxyPolicy {
                scope,
                delay: settings.proxy.delay_blocks.unwrap_or(0),
            },
        })
    }

    /// Load configuration from environment variables and the default config
    /// file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_toml(None)
    }

    /// Load from env with an optional TOML config file overlay.
    ///
    /// Loads both `./.env` (higher priority) and `~/.polkagent/.env`;
    /// dotenvy never overwrites variables that are already set.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        crate::bootstrap::load_agent_env();

        let mut settings = Settings::default();
        Self::apply_toml_overlay(&mut settings, toml_path)?;
        settings.apply_env_overrides()?;

        Self::from_settings(&settings)
    }

    /// Load and merge a TOML config file into settings.
    ///
    /// If `explicit_path` is `Some`, loads from that path (errors are fatal).
    /// If `None`, tries `~/.polkagent/config.toml` (missing file is ignored).
    fn apply_toml_overlay(
        settings: &mut Settings,
        explicit_path: Option<&Path>,
    ) -> Result<(), ConfigError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(toml_settings)) => {
                settings.merge_from(&toml_settings);
                tracing::debug!("Loaded TOML config from {}", path.display());
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Failed to load config file {}: {}",
                        path.display(),
                        e
                    )));
                }
                tracing::warn!("Failed to load default config file: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const AGENT_ENV_VARS: &[&str] = &[
        "LLM_API_KEY",
        "LLM_BASE_URL",
        "LLM_MODEL",
        "LLM_TEMPERATURE",
        "LLM_TIMEOUT_SECS",
        "CHAIN_ENDPOINT",
        "SIGNING_SECRET",
        "AGENT_INSTRUCTION_TEMPLATE",
        "PROXY_SCOPE",
        "PROXY_DELAY_BLOCKS",
    ];

    fn clear_agent_env() {
        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            for key in AGENT_ENV_VARS {
                std::env::remove_var(key);
            }
        }
    }

    fn complete_settings() -> Settings {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("sk-test".to_string());
        settings.chain.endpoint = Some("wss://westend-rpc.polkadot.io".to_string());
        settings.chain.signing_secret = Some("//Alice".to_string());
        settings
    }

    #[test]
    fn resolves_defaults_for_optional_fields() {
        let config = AgentConfig::from_settings(&complete_settings()).expect("valid config");

        assert_eq!(config.llm.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.timeout, Duration::from_secs(30));
        assert_eq!(config.llm.api_key.expose_secret(), "sk-test");
        assert_eq!(config.signing_secret.expose_secret(), "//Alice");
        assert_eq!(config.proxy_policy, ProxyPolicy::default());
        assert!(config.instruction_template.is_none());
    }

    #[test]
    fn missing_required_fields_are_named() {
        for (key, clear) in [
            ("LLM_API_KEY", 0usize),
            ("CHAIN_ENDPOINT", 1),
            ("SIGNING_SECRET", 2),
        ] {
            let mut settings = complete_settings();
            match clear {
                0 => settings.llm.api_key = None,
                1 => settings.chain.endpoint = Some("   ".to_string()),
                _ => settings.chain.signing_secret = None,
            }

            match AgentConfig::from_settings(&settings).unwrap_err() {
                ConfigError::MissingRequired { key: missing, .. } => assert_eq!(missing, key),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn accessors_only_expose_validated_values() {
        let mut settings = complete_settings();
        settings.chain.signing_secret = Some(" \t".to_string());
        assert!(matches!(
            AgentConfig::from_settings(&settings),
            Err(ConfigError::MissingRequired { ref key, .. }) if key == "SIGNING_SECRET"
        ));

        let config = AgentConfig::from_settings(&complete_settings()).unwrap();
        assert_eq!(config.chain_endpoint(), "wss://westend-rpc.polkadot.io");
        assert_eq!(config.signing_secret().expose_secret(), "//Alice");
        assert_eq!(config.llm().api_key.expose_secret(), "sk-test");
        assert_eq!(config.proxy_policy(), ProxyPolicy::default());
        assert_eq!(config.instruction_template(), None);
    }

    #[test]
    fn rejects_non_rpc_endpoint_scheme() {
        let mut settings = complete_settings();
        settings.chain.endpoint = Some("ftp://westend.example".to_string());

        let err = AgentConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CHAIN_ENDPOINT"));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let mut settings = complete_settings();
        settings.llm.temperature = Some(3.5);

        let err = AgentConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LLM_TEMPERATURE"));
    }

    #[test]
    fn proxy_policy_is_configurable() {
        let mut settings = complete_settings();
        settings.proxy.scope = Some("non_transfer".to_string());
        settings.proxy.delay_blocks = Some(12);

        let config = AgentConfig::from_settings(&settings).unwrap();
        assert_eq!(config.proxy_policy.scope, ProxyScope::NonTransfer);
        assert_eq!(config.proxy_policy.delay, 12);

        settings.proxy.scope = Some("everything".to_string());
        let err = AgentConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PROXY_SCOPE"));
    }

    #[test]
    fn env_overrides_win_over_toml() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_agent_env();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[llm]
api_key = "sk-from-file"
model = "gpt-4o"

[chain]
endpoint = "wss://westend-rpc.polkadot.io"
signing_secret = "//Bob"
"#,
        )
        .unwrap();

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("LLM_MODEL", "gpt-4o-mini");
            std::env::set_var("PROXY_DELAY_BLOCKS", "3");
        }

        let config = AgentConfig::from_env_with_toml(Some(&path)).expect("config resolves");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key.expose_secret(), "sk-from-file");
        assert_eq!(config.proxy_policy.delay, 3);

        clear_agent_env();
    }

    #[test]
    fn explicit_missing_config_file_is_fatal() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_agent_env();

        let dir = tempfile::tempdir().unwrap();
        let err = AgentConfig::from_env_with_toml(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_env_number_names_the_key() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_agent_env();

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("LLM_TEMPERATURE", "warm");
        }

        let mut settings = Settings::default();
        let err = settings.apply_env_overrides().unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "LLM_TEMPERATURE"),
            other => panic!("unexpected error: {other}"),
        }

        clear_agent_env();
    }
}
