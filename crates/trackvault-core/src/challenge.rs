use serde::{Deserialize, Serialize};

use crate::error::AccessError;
use crate::resource::ProtectedResource;

/// Server-issued description of the payment required to unlock a resource.
///
/// Ephemeral and never persisted. Derived purely from the server-held
/// resource record, so the same resource state always yields the same
/// challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChallenge {
    pub resource_id: String,
    /// Decimal amount string, e.g. "5.00" for 500 cents.
    pub amount: String,
    pub currency: String,
    pub network: String,
    pub recipient: String,
}

/// Render an integer cent amount as a decimal string ("5.00" for 500).
pub fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Build the payment challenge for a paid resource.
///
/// Pure function of resource price, currency, and recipient. A paid resource
/// without a price is a catalog invariant violation, not a caller error.
pub fn build_challenge(
    resource: &ProtectedResource,
    network: &str,
) -> Result<PaymentChallenge, AccessError> {
    let price_cents = resource.price_cents.ok_or_else(|| {
        AccessError::Internal(format!("paid resource {} has no price", resource.id))
    })?;

    Ok(PaymentChallenge {
        resource_id: resource.id.clone(),
        amount: format_cents(price_cents),
        currency: resource.currency.clone(),
        network: network.to_string(),
        recipient: resource.receiver_address.clone(),
    })
}
