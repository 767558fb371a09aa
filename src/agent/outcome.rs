//! Result and error normalization.
//!
//! Every prompt ends in one of a handful of fixed user-facing strings. Typed
//! detail stays in [`ActionOutcome`] and [`Error`] and goes to the log.

use num_bigint::BigUint;

use crate::chain::{ChainRef, TxReceipt};
use crate::error::Error;

pub const PROXY_ADDED: &str = "Proxy account added successfully.";
pub const PROXY_CONFIRMED: &str = "Proxy relationship confirmed.";
pub const PROXY_NOT_FOUND: &str = "No proxy relationship found for that address.";
pub const PROXY_REMOVED: &str = "Proxy account removed successfully.";
pub const TRANSFER_SUBMITTED: &str = "Cross-chain transfer submitted successfully.";
pub const INVALID_ACTION: &str = "Sorry, I can't perform that action.";
pub const GENERIC_FAILURE: &str = "Failed to process your request. Please try again.";

/// What a dispatched intent did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    ProxyAdded {
        receipt: TxReceipt,
    },
    ProxyStatus {
        exists: bool,
    },
    ProxyRemoved {
        receipt: TxReceipt,
    },
    TransferSubmitted {
        source: ChainRef,
        dest: ChainRef,
        base_units: BigUint,
        receipt: TxReceipt,
    },
    /// The model named an action the agent does not support.
    InvalidAction {
        action: String,
    },
}

impl ActionOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ProxyAdded { .. } => PROXY_ADDED,
            Self::ProxyStatus { exists: true } => PROXY_CONFIRMED,
            Self::ProxyStatus { exists: false } => PROXY_NOT_FOUND,
            Self::ProxyRemoved { .. } => PROXY_REMOVED,
            Self::TransferSubmitted { .. } => TRANSFER_SUBMITTED,
            Self::InvalidAction { .. } => INVALID_ACTION,
        }
    }

    /// Receipt of the submitted call, for state-changing outcomes.
    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            Self::ProxyAdded { receipt }
            | Self::ProxyRemoved { receipt }
            | Self::TransferSubmitted { receipt, .. } => Some(receipt),
            Self::ProxyStatus { .. } | Self::InvalidAction { .. } => None,
        }
    }
}

/// Typed result of one prompt, before normalization.
pub type PromptOutcome = Result<ActionOutcome, Error>;

/// Collapse a prompt outcome into the response contract.
///
/// Not-ready, disconnected and failed-initialization errors propagate.
/// Everything else is logged and replaced with [`GENERIC_FAILURE`].
pub fn to_response(outcome: PromptOutcome) -> Result<String, Error> {
    match outcome {
        Ok(outcome) => Ok(outcome.message().to_string()),
        Err(e) if e.is_caller_visible() => Err(e),
        Err(e) => {
            let payload = e.to_runtime_error_payload();
            tracing::error!(
                kind = ?payload.kind,
                code = payload.code,
                retryable = payload.retryable,
                "Prompt failed: {}",
                payload.message
            );
            Ok(GENERIC_FAILURE.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChainError, IntentError, LlmError, Resource};

    #[test]
    fn proxy_status_picks_message_by_existence() {
        assert_eq!(ActionOutcome::ProxyStatus { exists: true }.message(), PROXY_CONFIRMED);
        assert_eq!(ActionOutcome::ProxyStatus { exists: false }.message(), PROXY_NOT_FOUND);
    }

    #[test]
    fn invalid_action_is_a_successful_response() {
        let response = to_response(Ok(ActionOutcome::InvalidAction {
            action: "stake".to_string(),
        }))
        .unwrap();
        assert_eq!(response, INVALID_ACTION);
    }

    #[test]
    fn internal_failures_collapse_to_generic_string() {
        let failures = [
            Error::from(IntentError::InvalidJson("expected value".to_string())),
            Error::from(LlmError::AuthFailed {
                provider: "openai_compatible".to_string(),
            }),
            Error::from(ChainError::Rejected {
                call: "proxy.remove_proxy",
                reason: "NotFound".to_string(),
            }),
        ];
        for failure in failures {
            assert_eq!(to_response(Err(failure)).unwrap(), GENERIC_FAILURE);
        }
    }

    #[test]
    fn gate_failures_propagate() {
        let err = to_response(Err(Error::NotReady {
            missing: Resource::Connection,
        }))
        .unwrap_err();
        assert!(matches!(err, Error::NotReady { .. }));

        assert!(matches!(
            to_response(Err(Error::Disconnected)),
            Err(Error::Disconnected)
        ));
    }
}
