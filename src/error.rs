//! Error types for polkagent.

use std::time::Duration;

use regex::Regex;
use serde::Serialize;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Agent not initialized: {missing} is not ready")]
    NotReady { missing: Resource },

    #[error("Agent initialization failed during {stage}: {reason}")]
    InitializationFailed { stage: Resource, reason: String },

    #[error("Agent has been disconnected")]
    Disconnected,

    #[error("Malformed intent: {0}")]
    Intent(#[from] IntentError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

/// Resource guarded by the initialization gate.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    SigningKey,
    Connection,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SigningKey => write!(f, "signing key"),
            Self::Connection => write!(f, "chain connection"),
        }
    }
}

/// Closed classification of every failure the agent can report.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    NotReady,
    MalformedIntent,
    Model,
    Collaborator,
}

/// Structured failure record attached to operator log lines.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuntimeErrorPayload {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub retryable: bool,
    pub message: String,
}

impl RuntimeErrorPayload {
    fn new(
        kind: ErrorKind,
        code: &'static str,
        retryable: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            code,
            retryable,
            message: redact_sensitive_detail(&message.into()),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The model produced output that does not describe a valid intent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{field}' is invalid: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by chain collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Failed to connect to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Call {call} rejected by chain: {reason}")]
    Rejected { call: &'static str, reason: String },

    #[error("Insufficient balance: need {needed} base units, have {available}")]
    InsufficientBalance { needed: String, available: String },

    #[error("Unknown chain '{0}'")]
    UnknownChain(String),

    #[error("Session to {endpoint} is closed")]
    SessionClosed { endpoint: String },
}

impl Error {
    /// Classify this error for the outcome normalizer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::NotReady { .. } | Self::InitializationFailed { .. } | Self::Disconnected => {
                ErrorKind::NotReady
            }
            Self::Intent(_) => ErrorKind::MalformedIntent,
            Self::Llm(_) => ErrorKind::Model,
            Self::Chain(_) => ErrorKind::Collaborator,
        }
    }

    /// Whether this error reaches the caller as-is instead of being flattened
    /// into the generic failure response.
    pub fn is_caller_visible(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config | ErrorKind::NotReady)
    }

    /// Map errors into a structured record for log consumers.
    pub fn to_runtime_error_payload(&self) -> RuntimeErrorPayload {
        let kind = self.kind();
        match self {
            Self::Config(_) => {
                RuntimeErrorPayload::new(kind, "config.invalid", false, self.to_string())
            }
            Self::NotReady { .. } => {
                RuntimeErrorPayload::new(kind, "gate.not_ready", true, self.to_string())
            }
            Self::InitializationFailed { .. } => {
                RuntimeErrorPayload::new(kind, "gate.init_failed", false, self.to_string())
            }
            Self::Disconnected => {
                RuntimeErrorPayload::new(kind, "gate.disconnected", false, self.to_string())
            }
            Self::Intent(err) => {
                let code = match err {
                    IntentError::InvalidJson(_) => "intent.invalid_json",
                    IntentError::MissingField(_) => "intent.missing_field",
                    IntentError::WrongType { .. } => "intent.wrong_type",
                    IntentError::InvalidValue { .. } => "intent.invalid_value",
                };
                RuntimeErrorPayload::new(kind, code, false, self.to_string())
            }
            Self::Llm(err) => {
                let (code, retryable) = match err {
                    LlmError::AuthFailed { .. } => ("model.auth_failed", false),
                    LlmError::RateLimited { .. } => ("model.rate_limited", true),
                    LlmError::RequestFailed { .. } => ("model.request_failed", true),
                    LlmError::InvalidResponse { .. } => ("model.invalid_response", false),
                    LlmError::Http(_) => ("model.http_error", true),
                    LlmError::Json(_) => ("model.json_error", false),
                };
                RuntimeErrorPayload::new(kind, code, retryable, self.to_string())
            }
            Self::Chain(err) => {
                let (code, retryable) = match err {
                    ChainError::ConnectionFailed { .. } => ("chain.connection_failed", true),
                    ChainError::KeyDerivation(_) => ("chain.key_derivation_failed", false),
                    ChainError::Signing(_) => ("chain.signing_failed", false),
                    ChainError::Rejected { .. } => ("chain.rejected", false),
                    ChainError::InsufficientBalance { .. } => ("chain.insufficient_balance", false),
                    ChainError::UnknownChain(_) => ("chain.unknown_chain", false),
                    ChainError::SessionClosed { .. } => ("chain.session_closed", false),
                };
                RuntimeErrorPayload::new(kind, code, retryable, self.to_string())
            }
        }
    }
}

/// Scrub credentials that upstream services sometimes echo back in errors.
pub fn redact_sensitive_detail(raw: &str) -> String {
    let mut value = raw.to_string();
    let patterns = [
        (r"(?i)\b(bearer)\s+[a-z0-9._\-~+/]+=*", "$1 [REDACTED]"),
        (
            r"(?i)\b(token|api[_\-]?key|secret|password|seed)\b(\s*[:=]\s*)([^,\s]+)",
            "$1$2[REDACTED]",
        ),
        (r"(?i)\bsk-[a-z0-9\-]{10,}\b", "sk-[REDACTED]"),
    ];

    for (pattern, replacement) in patterns {
        if let Ok(re) = Regex::new(pattern) {
            value = re.replace_all(&value, replacement).to_string();
        }
    }

    value
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_names_the_missing_resource() {
        let err = Error::NotReady {
            missing: Resource::SigningKey,
        };
        assert!(err.to_string().contains("signing key"));

        let err = Error::NotReady {
            missing: Resource::Connection,
        };
        assert!(err.to_string().contains("chain connection"));
        assert!(err.is_caller_visible());
    }

    #[test]
    fn maps_intent_errors_to_malformed_kind() {
        let err = Error::from(IntentError::MissingField("proxyAddress"));
        let payload = err.to_runtime_error_payload();

        assert_eq!(payload.kind, ErrorKind::MalformedIntent);
        assert_eq!(payload.code, "intent.missing_field");
        assert!(!payload.retryable);
        assert!(!err.is_caller_visible());
    }

    #[test]
    fn maps_chain_failures_to_collaborator_kind() {
        let err = Error::from(ChainError::ConnectionFailed {
            endpoint: "wss://westend-rpc.polkadot.io".to_string(),
            reason: "socket closed".to_string(),
        });
        let payload = err.to_runtime_error_payload();

        assert_eq!(payload.kind, ErrorKind::Collaborator);
        assert_eq!(payload.code, "chain.connection_failed");
        assert!(payload.retryable);
    }

    #[test]
    fn payload_messages_are_redacted() {
        let err = Error::from(LlmError::RequestFailed {
            provider: "openai".to_string(),
            reason: "upstream echoed api_key=sk-abcdef1234567890".to_string(),
        });
        let payload = err.to_runtime_error_payload();

        assert!(!payload.message.contains("sk-abcdef1234567890"));
        assert!(payload.message.contains("[REDACTED]"));
    }

    #[test]
    fn redacts_bearer_tokens() {
        let redacted = redact_sensitive_detail("Authorization: Bearer abc.def-123");
        assert_eq!(redacted, "Authorization: Bearer [REDACTED]");
    }
}
