//! In-memory paper ledger.
//!
//! Implements the chain collaborator traits without a network so the agent
//! can run end to end: proxy relationships and transfers are recorded in
//! memory and every state-changing call returns a deterministic receipt
//! digest. Connections opened by one connector share a single ledger.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use num_bigint::BigUint;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::chain::{ChainConnector, ChainRef, ChainSession, ProxyScope, Signer, TxReceipt};
use crate::error::ChainError;

/// Chain names the paper ledger can route between, with their para ids
/// (0 is the relay chain).
const KNOWN_CHAINS: &[(&str, u32)] = &[
    ("polkadot", 0),
    ("kusama", 0),
    ("westend", 0),
    ("paseo", 0),
    ("assethub", 1000),
    ("assethubwestend", 1000),
    ("collectives", 1001),
    ("bridgehub", 1002),
    ("people", 1004),
    ("coretime", 1005),
];

/// One registered proxy relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyEntry {
    pub delegate: String,
    pub scope: ProxyScope,
    pub delay: u32,
}

/// One executed cross-chain transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: String,
    pub source: ChainRef,
    pub dest: ChainRef,
    pub recipient: String,
    pub amount: BigUint,
    pub receipt: TxReceipt,
}

#[derive(Debug, Default)]
struct LedgerState {
    proxies: HashMap<String, Vec<ProxyEntry>>,
    transfers: Vec<TransferRecord>,
    spent: HashMap<String, BigUint>,
}

/// Shared ledger state behind every simulated session.
#[derive(Debug, Default)]
pub struct SimulatedLedger {
    state: Mutex<LedgerState>,
    /// Per-account spend limit in base units; `None` means unlimited.
    balance: Option<BigUint>,
}

impl SimulatedLedger {
    /// Proxies registered by `delegator`.
    pub async fn proxies_of(&self, delegator: &str) -> Vec<ProxyEntry> {
        self.state
            .lock()
            .await
            .proxies
            .get(delegator)
            .cloned()
            .unwrap_or_default()
    }

    /// All transfers executed so far, oldest first.
    pub async fn transfers(&self) -> Vec<TransferRecord> {
        self.state.lock().await.transfers.clone()
    }
}

/// Connector handing out sessions over one shared [`SimulatedLedger`].
#[derive(Debug, Default)]
pub struct SimulatedConnector {
    ledger: Arc<SimulatedLedger>,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap how many base units each account may transfer in total.
    pub fn with_balance(balance: BigUint) -> Self {
        Self {
            ledger: Arc::new(SimulatedLedger {
                state: Mutex::new(LedgerState::default()),
                balance: Some(balance),
            }),
        }
    }

    pub fn ledger(&self) -> Arc<SimulatedLedger> {
        Arc::clone(&self.ledger)
    }
}

#[async_trait]
impl ChainConnector for SimulatedConnector {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainSession>, ChainError> {
        let parsed = url::Url::parse(endpoint).map_err(|e| ChainError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(
            "Opened simulated session for {}",
            parsed.host_str().unwrap_or(endpoint)
        );
        Ok(Arc::new(SimulatedSession {
            endpoint: endpoint.to_string(),
            ledger: Arc::clone(&self.ledger),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Session over the paper ledger.
#[derive(Debug)]
pub struct SimulatedSession {
    endpoint: String,
    ledger: Arc<SimulatedLedger>,
    closed: AtomicBool,
}

#[derive(Serialize)]
struct SignedCall<'a, T: Serialize> {
    call: &'a str,
    signer: &'a str,
    args: T,
}

impl SimulatedSession {
    fn ensure_open(&self) -> Result<(), ChainError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChainError::SessionClosed {
                endpoint: self.endpoint.clone(),
            });
        }
        Ok(())
    }

    fn submit<T: Serialize>(
        &self,
        signer: &dyn Signer,
        call: &'static str,
        args: T,
    ) -> Result<TxReceipt, ChainError> {
        let payload = serde_json::to_vec(&SignedCall {
            call,
            signer: signer.address(),
            args,
        })
        .map_err(|e| ChainError::Rejected {
            call,
            reason: format!("failed to encode call: {}", e),
        })?;
        let signature = signer.sign(&payload)?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(&payload);
        hasher.update(&signature);

        Ok(TxReceipt {
            receipt_id: Uuid::new_v4(),
            call: call.to_string(),
            signer: signer.address().to_string(),
            call_hash: hasher.finalize().to_hex().to_string(),
            submitted_at: Utc::now(),
        })
    }

    fn resolve(chain: &ChainRef) -> Result<ChainRef, ChainError> {
        match chain {
            ChainRef::Named(name) => {
                let wanted = name.to_ascii_lowercase().replace(['-', '_'], "");
                KNOWN_CHAINS
                    .iter()
                    .find(|(known, _)| *known == wanted)
                    .map(|(_, id)| ChainRef::from_id(*id))
                    .ok_or_else(|| ChainError::UnknownChain(name.clone()))
            }
            other => Ok(other.clone()),
        }
    }
}

#[async_trait]
impl ChainSession for SimulatedSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn add_proxy(
        &self,
        signer: &dyn Signer,
        delegate: &str,
        scope: ProxyScope,
        delay: u32,
    ) -> Result<TxReceipt, ChainError> {
        self.ensure_open()?;
        if delegate == signer.address() {
            return Err(ChainError::Rejected {
                call: "proxy.add_proxy",
                reason: "NoSelfProxy".to_string(),
            });
        }

        let mut state = self.ledger.state.lock().await;
        let entries = state
            .proxies
            .entry(signer.address().to_string())
            .or_default();
        if entries
            .iter()
            .any(|entry| entry.delegate == delegate && entry.scope == scope)
        {
            return Err(ChainError::Rejected {
                call: "proxy.add_proxy",
                reason: "Duplicate".to_string(),
            });
        }

        let receipt = self.submit(signer, "proxy.add_proxy", (delegate, scope, delay))?;
        entries.push(ProxyEntry {
            delegate: delegate.to_string(),
            scope,
            delay,
        });
        Ok(receipt)
    }

    async fn has_proxy(&self, delegator: &str, delegate: &str) -> Result<bool, ChainError> {
        self.ensure_open()?;
        let state = self.ledger.state.lock().await;
        Ok(state
            .proxies
            .get(delegator)
            .is_some_and(|entries| entries.iter().any(|entry| entry.delegate == delegate)))
    }

    async fn remove_proxy(
        &self,
        signer: &dyn Signer,
        delegate: &str,
        scope: ProxyScope,
    ) -> Result<TxReceipt, ChainError> {
        self.ensure_open()?;
        let mut state = self.ledger.state.lock().await;
        let Some(entries) = state.proxies.get_mut(signer.address()) else {
            return Err(ChainError::Rejected {
                call: "proxy.remove_proxy",
                reason: "NotFound".to_string(),
            });
        };
        let Some(position) = entries
            .iter()
            .position(|entry| entry.delegate == delegate && entry.scope == scope)
        else {
            return Err(ChainError::Rejected {
                call: "proxy.remove_proxy",
                reason: "NotFound".to_string(),
            });
        };

        let receipt = self.submit(signer, "proxy.remove_proxy", (delegate, scope))?;
        entries.remove(position);
        Ok(receipt)
    }

    async fn xcm_transfer(
        &self,
        signer: &dyn Signer,
        source: &ChainRef,
        dest: &ChainRef,
        recipient: &str,
        amount: &BigUint,
    ) -> Result<TxReceipt, ChainError> {
        self.ensure_open()?;
        let from_chain = Self::resolve(source)?;
        let to_chain = Self::resolve(dest)?;
        if from_chain == to_chain {
            return Err(ChainError::Rejected {
                call: "xcm.transfer_assets",
                reason: format!("source and destination both resolve to {}", from_chain),
            });
        }

        let mut state = self.ledger.state.lock().await;
        let already_spent = state
            .spent
            .get(signer.address())
            .cloned()
            .unwrap_or_default();
        let total = &already_spent + amount;
        if let Some(balance) = &self.ledger.balance
            && &total > balance
        {
            return Err(ChainError::InsufficientBalance {
                needed: amount.to_string(),
                available: (balance - &already_spent).to_string(),
            });
        }

        let receipt = self.submit(
            signer,
            "xcm.transfer_assets",
            (&from_chain, &to_chain, recipient, amount.to_string()),
        )?;
        state.spent.insert(signer.address().to_string(), total);
        state.transfers.push(TransferRecord {
            from: signer.address().to_string(),
            source: from_chain,
            dest: to_chain,
            recipient: recipient.to_string(),
            amount: amount.clone(),
            receipt: receipt.clone(),
        });
        Ok(receipt)
    }

    async fn disconnect(&self) -> Result<(), ChainError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("Closed simulated session for {}", self.endpoint);
        }
        Ok(())
    }
}
