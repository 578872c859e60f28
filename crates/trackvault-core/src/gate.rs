//! The resource gate: the access decision state machine.
//!
//! Decides FREE-PASS, NEEDS-PAYMENT, VERIFY-AND-GRANT, or DENY for each
//! request. Steps are strictly ordered and the first match wins; everything
//! before the ledger write is read-only, so requests can race freely and the
//! ledger's uniqueness constraints are the only coordination point.

use serde::Serialize;

use crate::challenge::build_challenge;
use crate::constants::NETWORK;
use crate::error::AccessError;
use crate::ledger::{Ledger, NewPayment, RecordedPayment};
use crate::proof::PaymentProof;
use crate::resource::ProtectedResource;
use crate::verifier::{PaymentVerifier, VerifyOutcome};

/// Per-request gate configuration, injected by the host.
///
/// `payments_enabled` is the kill switch: when false, the payment pathway is
/// closed entirely (fail closed) while existing entitlements stay honored.
/// Read on every request; never cached here.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub payments_enabled: bool,
    pub network: String,
}

impl GateConfig {
    pub fn new(payments_enabled: bool) -> Self {
        Self {
            payments_enabled,
            network: NETWORK.to_string(),
        }
    }
}

/// How access was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessDecision {
    FreePass,
    AlreadyEntitled,
    NewlyEntitled,
}

/// A granted request: the decision, the access URL from the storage
/// collaborator, and the ledger rows when a payment was just recorded.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub decision: AccessDecision,
    pub url: String,
    pub payment: Option<RecordedPayment>,
}

/// Storage collaborator: turns a granted resource into an access URL.
pub trait AccessUrlIssuer: Send + Sync {
    fn issue(
        &self,
        resource: &ProtectedResource,
    ) -> impl std::future::Future<Output = Result<String, AccessError>> + Send;
}

/// The orchestrating state machine over ledger, verifier, and URL issuer.
pub struct ResourceGate<L, V, U> {
    ledger: L,
    verifier: V,
    urls: U,
}

impl<L, V, U> ResourceGate<L, V, U>
where
    L: Ledger,
    V: PaymentVerifier,
    U: AccessUrlIssuer,
{
    pub fn new(ledger: L, verifier: V, urls: U) -> Self {
        Self {
            ledger,
            verifier,
            urls,
        }
    }

    /// Decide access for one request. First match wins:
    ///
    /// 1. free resource → grant, no identity required
    /// 2. no caller → `AuthenticationRequired`
    /// 3. existing entitlement → grant (verifier never contacted)
    /// 4. kill switch engaged → `PaymentsDisabled`
    /// 5. no proof → `PaymentRequired` carrying a fresh challenge
    /// 6. malformed proof → `InvalidPaymentFormat`
    /// 7. verifier rejects → `PaymentVerificationFailed`
    /// 8. verified → record atomically; a ledger conflict for this same
    ///    (caller, resource) pair is a grant, not an error
    /// 9. grant → issue the access URL
    pub async fn request_access(
        &self,
        config: &GateConfig,
        resource: &ProtectedResource,
        caller: Option<&str>,
        raw_proof: Option<&str>,
    ) -> Result<AccessGrant, AccessError> {
        if !resource.is_paid {
            return self.grant(resource, AccessDecision::FreePass, None).await;
        }

        let caller = caller.ok_or(AccessError::AuthenticationRequired)?;

        if self.ledger.is_entitled(caller, &resource.id)? {
            return self
                .grant(resource, AccessDecision::AlreadyEntitled, None)
                .await;
        }

        if !config.payments_enabled {
            tracing::info!(
                caller = %caller,
                resource = %resource.id,
                "payment pathway disabled, denying access"
            );
            return Err(AccessError::PaymentsDisabled);
        }

        let raw = match raw_proof {
            Some(raw) => raw,
            None => {
                return Err(AccessError::PaymentRequired(build_challenge(
                    resource,
                    &config.network,
                )?))
            }
        };

        let proof = PaymentProof::decode(raw)?;

        let price_cents = resource.price_cents.ok_or_else(|| {
            AccessError::Internal(format!("paid resource {} has no price", resource.id))
        })?;

        // Amount and recipient come from the server-held record, never from
        // the proof.
        let outcome = self
            .verifier
            .verify(&proof, price_cents, &resource.receiver_address)
            .await?;

        let payment = match outcome {
            VerifyOutcome::Verified(payment) => payment,
            VerifyOutcome::Rejected { reason } => {
                tracing::warn!(
                    caller = %caller,
                    resource = %resource.id,
                    reason = %reason,
                    "payment rejected"
                );
                return Err(AccessError::PaymentVerificationFailed(reason));
            }
        };

        let new_payment = NewPayment {
            caller_id: caller,
            resource_id: &resource.id,
            amount_cents: price_cents,
            currency: &resource.currency,
            recipient: &resource.receiver_address,
            network: &config.network,
            payment: &payment,
        };

        match self.ledger.record_payment(new_payment) {
            Ok(recorded) => {
                tracing::info!(
                    caller = %caller,
                    resource = %resource.id,
                    tx_ref = %recorded.transaction.tx_ref,
                    "payment recorded, entitlement created"
                );
                self.grant(resource, AccessDecision::NewlyEntitled, Some(recorded))
                    .await
            }
            Err(AccessError::LedgerConflict) => {
                // A concurrent or retried request already recorded this
                // payment. Confirm the conflicting rows belong to this
                // (caller, resource) pair before treating it as success.
                if self.ledger.is_entitled(caller, &resource.id)? {
                    tracing::info!(
                        caller = %caller,
                        resource = %resource.id,
                        "duplicate payment submission, already entitled"
                    );
                    self.grant(resource, AccessDecision::AlreadyEntitled, None)
                        .await
                } else {
                    tracing::warn!(
                        caller = %caller,
                        resource = %resource.id,
                        "idempotency key already recorded for a different purchase"
                    );
                    Err(AccessError::PaymentVerificationFailed(
                        "payment reference already used".to_string(),
                    ))
                }
            }
            Err(e) => Err(e),
        }
    }

    // The URL issuer runs after access is decided; its failure never unwinds
    // a completed ledger write.
    async fn grant(
        &self,
        resource: &ProtectedResource,
        decision: AccessDecision,
        payment: Option<RecordedPayment>,
    ) -> Result<AccessGrant, AccessError> {
        let url = self.urls.issue(resource).await?;
        Ok(AccessGrant {
            decision,
            url,
            payment,
        })
    }
}
