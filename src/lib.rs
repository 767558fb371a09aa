//! polkagent: natural-language proxy management and cross-chain transfers.
//!
//! A prompt is turned into a structured intent by a language model,
//! validated, and dispatched to exactly one chain operation once the agent's
//! signing key and chain session are ready.

pub mod agent;
pub mod bootstrap;
pub mod chain;
pub mod channels;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod settings;

pub use agent::{Agent, Collaborators};
pub use config::AgentConfig;
pub use error::{Error, Result};
