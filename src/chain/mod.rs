//! Chain collaborator surface.
//!
//! The agent never talks to a node directly. It consumes these traits:
//! [`KeyDerivation`] turns the configured secret into a [`Signer`],
//! [`ChainConnector`] opens a [`ChainSession`], and the session exposes the
//! proxy and cross-chain transfer primitives.

pub mod keys;
pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChainError;

pub use self::keys::{EcdsaKeyDerivation, EcdsaSigner};
pub use self::simulated::{SimulatedConnector, SimulatedSession};

/// Delegation scope of a proxy relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyScope {
    /// Unrestricted proxy rights.
    #[default]
    Any,
    NonTransfer,
    Governance,
    Staking,
    CancelProxy,
    Auction,
    NominationPools,
}

impl ProxyScope {
    pub const ALL: [ProxyScope; 7] = [
        Self::Any,
        Self::NonTransfer,
        Self::Governance,
        Self::Staking,
        Self::CancelProxy,
        Self::Auction,
        Self::NominationPools,
    ];

    /// Parse a scope name, ignoring case and `_`/`-`/space separators.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw
            .trim()
            .to_ascii_lowercase()
            .replace(['_', '-', ' '], "");
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str().to_ascii_lowercase() == wanted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::NonTransfer => "NonTransfer",
            Self::Governance => "Governance",
            Self::Staking => "Staking",
            Self::CancelProxy => "CancelProxy",
            Self::Auction => "Auction",
            Self::NominationPools => "NominationPools",
        }
    }
}

impl std::fmt::Display for ProxyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope and activation delay used for proxy add/remove calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyPolicy {
    pub scope: ProxyScope,
    /// Announcement delay in blocks; 0 means effective immediately.
    pub delay: u32,
}

/// Reference to a chain in the relay-chain network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChainRef {
    Relay,
    Parachain(u32),
    Named(String),
}

impl ChainRef {
    /// Relay-chain sentinel name.
    pub const RELAY: &'static str = "relay";

    /// Parse a textual chain identifier.
    ///
    /// `relay` (any case) and `0` denote the relay chain, other digit strings
    /// are parachain ids, anything else must be a plain chain name.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("chain identifier cannot be empty".to_string());
        }
        if trimmed.eq_ignore_ascii_case(Self::RELAY) {
            return Ok(Self::Relay);
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let id: u32 = trimmed
                .parse()
                .map_err(|e| format!("parachain id '{}' out of range: {}", trimmed, e))?;
            return Ok(Self::from_id(id));
        }
        if !trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(format!(
                "invalid chain name '{}': only [A-Za-z0-9_-] are allowed",
                trimmed
            ));
        }
        Ok(Self::Named(trimmed.to_string()))
    }

    pub fn from_id(id: u32) -> Self {
        if id == 0 { Self::Relay } else { Self::Parachain(id) }
    }
}

impl std::fmt::Display for ChainRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Relay => f.write_str(Self::RELAY),
            Self::Parachain(id) => write!(f, "parachain {}", id),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Immutable record of a submitted, state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub receipt_id: Uuid,
    pub call: String,
    pub signer: String,
    /// blake3 digest of the signed call payload.
    pub call_hash: String,
    pub submitted_at: DateTime<Utc>,
}

/// Signing identity owned by the agent.
pub trait Signer: Send + Sync {
    /// The account address derived from this identity.
    fn address(&self) -> &str;

    /// Sign an encoded call payload.
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, ChainError>;
}

/// Derives the signing identity from the configured secret.
#[async_trait]
pub trait KeyDerivation: Send + Sync {
    async fn derive(&self, secret: &SecretString) -> Result<Arc<dyn Signer>, ChainError>;
}

/// Opens sessions against a chain endpoint.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainSession>, ChainError>;
}

/// A live session exposing the ledger primitives the agent dispatches to.
#[async_trait]
pub trait ChainSession: Send + Sync {
    fn endpoint(&self) -> &str;

    /// Register `delegate` as a proxy of the signer's account.
    async fn add_proxy(
        &self,
        signer: &dyn Signer,
        delegate: &str,
        scope: ProxyScope,
        delay: u32,
    ) -> Result<TxReceipt, ChainError>;

    /// Whether `delegate` is a proxy of `delegator`. Read-only.
    async fn has_proxy(&self, delegator: &str, delegate: &str) -> Result<bool, ChainError>;

    /// Remove `delegate` from the signer's proxies.
    async fn remove_proxy(
        &self,
        signer: &dyn Signer,
        delegate: &str,
        scope: ProxyScope,
    ) -> Result<TxReceipt, ChainError>;

    /// Move `amount` base units of the native token across chains.
    async fn xcm_transfer(
        &self,
        signer: &dyn Signer,
        source: &ChainRef,
        dest: &ChainRef,
        recipient: &str,
        amount: &BigUint,
    ) -> Result<TxReceipt, ChainError>;

    async fn disconnect(&self) -> Result<(), ChainError>;
}
