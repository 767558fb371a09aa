//! Initialization gate.
//!
//! Every chain-touching operation goes through [`InitGate`]. The gate starts
//! `Pending`, receives the signing identity and then the chain session from
//! the setup task, and flips to `Ready` once both exist. Waiters attach to a
//! watch channel, so readiness is observed without polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::chain::{ChainSession, Signer};
use crate::error::{Error, Resource};

/// Resources available once initialization has completed.
#[derive(Clone)]
pub struct ReadyResources {
    pub signer: Arc<dyn Signer>,
    pub session: Arc<dyn ChainSession>,
}

impl std::fmt::Debug for ReadyResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyResources")
            .field("address", &self.signer.address())
            .field("endpoint", &self.session.endpoint())
            .finish()
    }
}

#[derive(Clone)]
enum GateState {
    Pending { signer: Option<Arc<dyn Signer>> },
    Ready(ReadyResources),
    Failed { stage: Resource, reason: String },
    Disconnected,
}

/// Snapshot of the gate for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    Pending { missing: Resource },
    Ready,
    Failed { stage: Resource, reason: String },
    Disconnected,
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending { missing } => write!(f, "initializing (waiting for {})", missing),
            Self::Ready => write!(f, "ready"),
            Self::Failed { stage, reason } => write!(f, "failed during {}: {}", stage, reason),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

pub struct InitGate {
    state: watch::Sender<GateState>,
}

impl Default for InitGate {
    fn default() -> Self {
        Self::new()
    }
}

impl InitGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Pending { signer: None });
        Self { state }
    }

    /// Record the derived signing identity. Ignored unless still pending.
    pub fn publish_signer(&self, signer: Arc<dyn Signer>) -> bool {
        self.state.send_if_modified(|state| match state {
            GateState::Pending { signer: slot } if slot.is_none() => {
                *slot = Some(signer);
                true
            }
            _ => false,
        })
    }

    /// Record the open session and mark the gate ready.
    ///
    /// Returns `false` when the gate has left `Pending` (e.g. disconnected
    /// during setup) or no signer was published; the caller owns the session
    /// in that case.
    pub fn publish_session(&self, session: Arc<dyn ChainSession>) -> bool {
        self.state.send_if_modified(|state| {
            let GateState::Pending {
                signer: Some(signer),
            } = state
            else {
                return false;
            };
            let signer = signer.clone();
            *state = GateState::Ready(ReadyResources { signer, session });
            true
        })
    }

    /// Mark setup as failed. Waiters are released with
    /// [`Error::InitializationFailed`].
    pub fn fail(&self, stage: Resource, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.state.send_if_modified(|state| match state {
            GateState::Pending { .. } => {
                *state = GateState::Failed { stage, reason };
                true
            }
            _ => false,
        })
    }

    /// Move to `Disconnected`, returning the resources if the gate was ready.
    pub fn disconnect(&self) -> Option<ReadyResources> {
        match self.state.send_replace(GateState::Disconnected) {
            GateState::Ready(resources) => Some(resources),
            _ => None,
        }
    }

    pub fn status(&self) -> GateStatus {
        match &*self.state.borrow() {
            GateState::Pending { signer } => GateStatus::Pending {
                missing: missing_resource(signer),
            },
            GateState::Ready(_) => GateStatus::Ready,
            GateState::Failed { stage, reason } => GateStatus::Failed {
                stage: *stage,
                reason: reason.clone(),
            },
            GateState::Disconnected => GateStatus::Disconnected,
        }
    }

    /// The caller's own address, once the signing identity exists.
    pub fn address(&self) -> Option<String> {
        match &*self.state.borrow() {
            GateState::Pending {
                signer: Some(signer),
            } => Some(signer.address().to_string()),
            GateState::Ready(resources) => Some(resources.signer.address().to_string()),
            _ => None,
        }
    }

    /// Current resources without waiting.
    pub fn resources(&self) -> Result<ReadyResources, Error> {
        resolve(&self.state.borrow())
    }

    /// Wait until the gate leaves `Pending`. No built-in timeout.
    pub async fn wait_ready(&self) -> Result<ReadyResources, Error> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|state| !matches!(state, GateState::Pending { .. }))
            .await
            .map_err(|_| Error::Disconnected)?;
        resolve(&state)
    }

    /// Like [`wait_ready`](Self::wait_ready), giving up after `timeout` with
    /// a not-ready error naming the missing resource.
    pub async fn wait_ready_timeout(&self, timeout: Duration) -> Result<ReadyResources, Error> {
        match tokio::time::timeout(timeout, self.wait_ready()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!("Gave up waiting for readiness after {:?}", timeout);
                self.resources()
            }
        }
    }
}

fn missing_resource(signer: &Option<Arc<dyn Signer>>) -> Resource {
    if signer.is_some() {
        Resource::Connection
    } else {
        Resource::SigningKey
    }
}

fn resolve(state: &GateState) -> Result<ReadyResources, Error> {
    match state {
        GateState::Pending { signer } => Err(Error::NotReady {
            missing: missing_resource(signer),
        }),
        GateState::Ready(resources) => Ok(resources.clone()),
        GateState::Failed { stage, reason } => Err(Error::InitializationFailed {
            stage: *stage,
            reason: reason.clone(),
        }),
        GateState::Disconnected => Err(Error::Disconnected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainConnector, EcdsaKeyDerivation, KeyDerivation, SimulatedConnector};
    use secrecy::SecretString;

    async fn signer() -> Arc<dyn Signer> {
        EcdsaKeyDerivation::new()
            .derive(&SecretString::from("//Alice".to_string()))
            .await
            .unwrap()
    }

    async fn session() -> Arc<dyn ChainSession> {
        SimulatedConnector::new()
            .connect("wss://westend-rpc.polkadot.io")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn names_the_missing_resource_in_order() {
        let gate = InitGate::new();
        assert!(matches!(
            gate.resources(),
            Err(Error::NotReady {
                missing: Resource::SigningKey
            })
        ));

        assert!(gate.publish_signer(signer().await));
        assert!(matches!(
            gate.resources(),
            Err(Error::NotReady {
                missing: Resource::Connection
            })
        ));
        assert!(gate.address().is_some());

        assert!(gate.publish_session(session().await));
        assert!(gate.resources().is_ok());
        assert_eq!(gate.status(), GateStatus::Ready);
    }

    #[tokio::test]
    async fn session_without_signer_is_rejected() {
        let gate = InitGate::new();
        assert!(!gate.publish_session(session().await));
        assert_eq!(
            gate.status(),
            GateStatus::Pending {
                missing: Resource::SigningKey
            }
        );
    }

    #[tokio::test]
    async fn waiters_are_released_on_ready() {
        let gate = Arc::new(InitGate::new());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_ready().await.map(|r| r.signer.address().to_string()) })
        };

        tokio::task::yield_now().await;
        gate.publish_signer(signer().await);
        gate.publish_session(session().await);

        let address = waiter.await.unwrap().unwrap();
        assert_eq!(Some(address), gate.address());
    }

    #[tokio::test]
    async fn waiters_are_released_on_failure() {
        let gate = Arc::new(InitGate::new());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_ready().await })
        };

        gate.fail(Resource::Connection, "connection refused");
        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::InitializationFailed {
                stage: Resource::Connection,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn timeout_variant_reports_not_ready() {
        let gate = InitGate::new();
        let err = gate
            .wait_ready_timeout(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotReady {
                missing: Resource::SigningKey
            }
        ));
    }

    #[tokio::test]
    async fn disconnect_is_terminal() {
        let gate = InitGate::new();
        gate.publish_signer(signer().await);
        gate.publish_session(session().await);

        assert!(gate.disconnect().is_some());
        assert!(matches!(gate.resources(), Err(Error::Disconnected)));
        assert!(matches!(gate.wait_ready().await, Err(Error::Disconnected)));

        // Late publishes after disconnect are ignored.
        assert!(!gate.publish_signer(signer().await));
        assert!(!gate.fail(Resource::SigningKey, "late"));
        assert!(gate.disconnect().is_none());
    }
}
