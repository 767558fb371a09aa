//! Language-model access for intent extraction.

mod openai;

use async_trait::async_trait;

use crate::error::LlmError;

pub use self::openai::OpenAiCompatibleModel;

/// A model that turns a user prompt into the raw text of an intent object.
///
/// Implementations return the model's text verbatim; parsing and validation
/// happen in the agent.
#[async_trait]
pub trait IntentModel: Send + Sync {
    /// Provider label used in logs and errors.
    fn provider(&self) -> &str;

    async fn complete(&self, instructions: &str, prompt: &str) -> Result<String, LlmError>;
}
