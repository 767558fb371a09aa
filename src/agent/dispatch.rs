//! Action dispatch: one validated intent, exactly one chain call.

use crate::agent::gate::ReadyResources;
use crate::agent::intent::{Intent, ParsedIntent};
use crate::agent::outcome::ActionOutcome;
use crate::agent::units::{from_base_units, to_base_units};
use crate::chain::ProxyPolicy;
use crate::error::ChainError;

/// Route `parsed` to its chain operation.
///
/// Unrecognized actions return [`ActionOutcome::InvalidAction`] without
/// touching the session. No retries.
pub async fn dispatch(
    parsed: ParsedIntent,
    resources: &ReadyResources,
    policy: ProxyPolicy,
) -> Result<ActionOutcome, ChainError> {
    let intent = match parsed {
        ParsedIntent::Valid(intent) => intent,
        ParsedIntent::Unrecognized { action } => {
            tracing::info!("Ignoring unsupported action '{}'", action);
            return Ok(ActionOutcome::InvalidAction { action });
        }
    };

    let signer = resources.signer.as_ref();
    let session = resources.session.as_ref();

    match intent {
        Intent::AddProxy { proxy_address } => {
            tracing::info!(
                "Adding proxy {} for {} (scope {}, delay {})",
                proxy_address,
                signer.address(),
                policy.scope,
                policy.delay
            );
            let receipt = session
                .add_proxy(signer, &proxy_address, policy.scope, policy.delay)
                .await?;
            Ok(ActionOutcome::ProxyAdded { receipt })
        }
        Intent::CheckProxy { proxy_address } => {
            let exists = session.has_proxy(signer.address(), &proxy_address).await?;
            tracing::info!(
                "Proxy {} of {}: {}",
                proxy_address,
                signer.address(),
                if exists { "present" } else { "absent" }
            );
            Ok(ActionOutcome::ProxyStatus { exists })
        }
        Intent::RemoveProxy { proxy_address } => {
            tracing::info!("Removing proxy {} from {}", proxy_address, signer.address());
            let receipt = session
                .remove_proxy(signer, &proxy_address, policy.scope)
                .await?;
            Ok(ActionOutcome::ProxyRemoved { receipt })
        }
        Intent::XcmTransfer {
            source_chain,
            dest_chain,
            amount,
        } => {
            let base_units = to_base_units(&amount);
            tracing::info!(
                "Transferring {} ({} base units) from {} to {} for {}",
                amount,
                from_base_units(&base_units),
                source_chain,
                dest_chain,
                signer.address()
            );
            let receipt = session
                .xcm_transfer(signer, &source_chain, &dest_chain, signer.address(), &base_units)
                .await?;
            Ok(ActionOutcome::TransferSubmitted {
                source: source_chain,
                dest: dest_chain,
                base_units,
                receipt,
            })
        }
    }
}
