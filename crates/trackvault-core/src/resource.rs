use serde::{Deserialize, Serialize};

/// The two classes of protected resource the gate serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Track,
    VaultAsset,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Track => "track",
            ResourceKind::VaultAsset => "vault_asset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "track" => Some(ResourceKind::Track),
            "vault_asset" => Some(ResourceKind::VaultAsset),
            _ => None,
        }
    }
}

/// A gated catalog entry. Owned by the surrounding catalog system; the gate
/// only reads it. `price_cents` is required whenever `is_paid` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedResource {
    pub id: String,
    pub kind: ResourceKind,
    pub title: String,
    pub is_paid: bool,
    pub price_cents: Option<u64>,
    pub currency: String,
    /// Payout destination for this resource's earnings.
    pub receiver_address: String,
    /// Storage collaborator locator, opaque to the gate.
    pub object_key: String,
}
