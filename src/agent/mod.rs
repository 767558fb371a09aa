//! The intent-to-action agent.
//!
//! [`Agent`] owns the initialization gate and the model client. A prompt
//! flows model -> [`intent::parse_intent`] -> [`dispatch::dispatch`] ->
//! [`outcome::to_response`].

pub mod dispatch;
pub mod gate;
pub mod intent;
pub mod outcome;
pub mod prompt;
pub mod units;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::chain::{ChainConnector, KeyDerivation};
use crate::config::AgentConfig;
use crate::error::{Error, Resource, redact_sensitive_detail};
use crate::llm::IntentModel;
use crate::settings::Settings;

pub use self::gate::{GateStatus, InitGate, ReadyResources};
pub use self::intent::{Intent, ParsedIntent, parse_intent};
pub use self::outcome::{ActionOutcome, PromptOutcome};
pub use self::units::{TokenAmount, from_base_units, to_base_units};

/// External services the agent depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn IntentModel>,
    pub keys: Arc<dyn KeyDerivation>,
    pub connector: Arc<dyn ChainConnector>,
}

pub struct Agent {
    config: AgentConfig,
    model: Arc<dyn IntentModel>,
    gate: Arc<InitGate>,
    /// Serializes use of the shared signer and session.
    dispatch_lock: Mutex<()>,
    init_task: JoinHandle<()>,
}

impl Agent {
    /// Create the agent and start initialization in the background.
    ///
    /// Returns immediately; use [`wait_for_ready`](Self::wait_for_ready) to
    /// block until the signing key and chain session exist. Must be called
    /// from within a tokio runtime.
    pub fn new(config: AgentConfig, collaborators: Collaborators) -> Self {
        let gate = Arc::new(InitGate::new());
        let init_task = tokio::spawn(initialize(
            Arc::clone(&gate),
            collaborators.keys,
            collaborators.connector,
            config.signing_secret().clone(),
            config.chain_endpoint().to_string(),
        ));

        Self {
            config,
            model: collaborators.model,
            gate,
            dispatch_lock: Mutex::new(()),
            init_task,
        }
    }

    /// Validate `settings` and create the agent.
    ///
    /// Fails before any initialization work when a required field is absent.
    pub fn from_settings(settings: &Settings, collaborators: Collaborators) -> Result<Self, Error> {
        let config = AgentConfig::from_settings(settings)?;
        Ok(Self::new(config, collaborators))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The agent's own account address, once the signing key is derived.
    pub fn address(&self) -> Option<String> {
        self.gate.address()
    }

    pub fn status(&self) -> GateStatus {
        self.gate.status()
    }

    /// Wait until initialization completes.
    pub async fn wait_for_ready(&self) -> Result<(), Error> {
        self.gate.wait_ready().await.map(|_| ())
    }

    /// Wait at most `timeout` for initialization to complete.
    pub async fn wait_for_ready_timeout(&self, timeout: Duration) -> Result<(), Error> {
        self.gate.wait_ready_timeout(timeout).await.map(|_| ())
    }

    /// Handle a natural-language prompt and return the user-facing response.
    ///
    /// Only not-ready, disconnected and failed-initialization conditions are
    /// returned as errors; every other failure is logged and reported as the
    /// generic failure message.
    pub async fn handle_prompt(&self, text: &str) -> Result<String, Error> {
        outcome::to_response(self.execute_prompt(text).await)
    }

    /// Like [`handle_prompt`](Self::handle_prompt) but returns the typed
    /// outcome without normalization.
    pub async fn execute_prompt(&self, text: &str) -> PromptOutcome {
        self.gate.resources()?;

        let instructions = prompt::instructions(self.config.instruction_template());
        let raw = self.model.complete(instructions, text).await?;
        tracing::debug!("Model {} returned: {}", self.model.provider(), raw);

        let parsed = parse_intent(&raw)?;

        let _guard = self.dispatch_lock.lock().await;
        // Disconnect may have happened while the model call was in flight.
        let resources = self.gate.resources()?;
        let outcome = dispatch::dispatch(parsed, &resources, self.config.proxy_policy()).await?;
        if let Some(receipt) = outcome.receipt() {
            tracing::info!(
                "Submitted {} as {} (call hash {})",
                receipt.call,
                receipt.receipt_id,
                receipt.call_hash
            );
        }
        Ok(outcome)
    }

    /// Close the chain session. Later operations fail with
    /// [`Error::Disconnected`].
    pub async fn disconnect(&self) -> Result<(), Error> {
        let _guard = self.dispatch_lock.lock().await;
        if let Some(resources) = self.gate.disconnect() {
            resources.session.disconnect().await?;
            tracing::info!("Disconnected from {}", resources.session.endpoint());
        }
        Ok(())
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.init_task.abort();
    }
}

async fn initialize(
    gate: Arc<InitGate>,
    keys: Arc<dyn KeyDerivation>,
    connector: Arc<dyn ChainConnector>,
    secret: SecretString,
    endpoint: String,
) {
    let signer = match keys.derive(&secret).await {
        Ok(signer) => signer,
        Err(e) => {
            let reason = redact_sensitive_detail(&e.to_string());
            tracing::error!("Signing key derivation failed: {}", reason);
            gate.fail(Resource::SigningKey, reason);
            return;
        }
    };
    let address = signer.address().to_string();
    if !gate.publish_signer(signer) {
        return;
    }

    let session = match connector.connect(&endpoint).await {
        Ok(session) => session,
        Err(e) => {
            let reason = redact_sensitive_detail(&e.to_string());
            tracing::error!("Chain connection to {} failed: {}", endpoint, reason);
            gate.fail(Resource::Connection, reason);
            return;
        }
    };

    if gate.publish_session(Arc::clone(&session)) {
        tracing::info!("Agent ready as {} on {}", address, endpoint);
    } else if let Err(e) = session.disconnect().await {
        tracing::warn!("Failed to close session opened after disconnect: {}", e);
    }
}
