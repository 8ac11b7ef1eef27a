//! Wallet signature challenge.
//!
//! The registry issues the challenge text and does the authoritative
//! verification. Optionally the gateway recovers the signer itself first
//! and refuses to forward signatures that do not match the claimed wallet.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{GatewayError, Result};
use crate::registry::AssistantRegistry;
use crate::wallet::{self, WalletAddress};

/// Result of a completed challenge. `address` is always the normalized
/// claimed address; `verified` says whether it may be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub verified: bool,
    pub address: WalletAddress,
}

impl AuthOutcome {
    fn rejected(address: &WalletAddress) -> Self {
        Self {
            verified: false,
            address: address.clone(),
        }
    }
}

#[derive(Clone)]
pub struct WalletAuth {
    registry: Arc<dyn AssistantRegistry>,
    local_signature_check: bool,
}

impl WalletAuth {
    pub fn new(registry: Arc<dyn AssistantRegistry>, local_signature_check: bool) -> Self {
        Self {
            registry,
            local_signature_check,
        }
    }

    /// Ask the registry for the message `address` must sign.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn begin_challenge(&self, address: &WalletAddress) -> Result<String> {
        let message = self.registry.auth_message(address).await?;
        if message.trim().is_empty() {
            return Err(GatewayError::Internal(
                "registry returned an empty challenge message".to_string(),
            ));
        }
        Ok(message)
    }

    /// Submit a signed challenge.
    ///
    /// A blank message or signature, a failed local recovery, or a registry
    /// verdict naming a different wallet all produce `verified: false`.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn complete_challenge(
        &self,
        address: &WalletAddress,
        message: &str,
        signature: &str,
    ) -> Result<AuthOutcome> {
        if message.trim().is_empty() || signature.trim().is_empty() {
            tracing::debug!("Rejecting challenge with blank message or signature");
            return Ok(AuthOutcome::rejected(address));
        }

        if self.local_signature_check {
            if !wallet::is_signature_like(signature) {
                tracing::debug!("Rejecting malformed signature");
                return Ok(AuthOutcome::rejected(address));
            }
            match wallet::verify_signature(message, signature, address) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("Signature recovers to a different wallet");
                    return Ok(AuthOutcome::rejected(address));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Signature could not be recovered");
                    return Ok(AuthOutcome::rejected(address));
                }
            }
        }

        let verdict = self
            .registry
            .auth_verify(address, message, signature)
            .await?;

        // A registry that reports a recovered address must agree with the claim.
        let address_matches = match verdict.address.as_deref() {
            Some(reported) => WalletAddress::parse(reported).is_ok_and(|r| r == *address),
            None => true,
        };
        let verified = verdict.verified && address_matches;
        if verdict.verified && !address_matches {
            tracing::warn!("Registry verified a different address than claimed");
        }
        tracing::info!(verified, "Wallet challenge completed");

        Ok(AuthOutcome {
            verified,
            address: address.clone(),
        })
    }
}
