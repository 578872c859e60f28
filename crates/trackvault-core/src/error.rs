use thiserror::Error;

use crate::challenge::PaymentChallenge;

/// Errors produced by the access gate and its collaborators.
///
/// Every caller-facing variant is terminal for the request. `LedgerConflict`
/// is the one internal exception: it signals that this exact payment was
/// already recorded, and the gate recovers it into a grant instead of
/// surfacing it.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("payments are disabled")]
    PaymentsDisabled,

    /// Not a failure: carries the challenge the caller must satisfy.
    #[error("payment required")]
    PaymentRequired(PaymentChallenge),

    #[error("invalid payment proof: {0}")]
    InvalidPaymentFormat(String),

    #[error("payment verification failed: {0}")]
    PaymentVerificationFailed(String),

    /// A ledger uniqueness constraint fired: the payment (or the
    /// entitlement it would create) already exists.
    #[error("payment already recorded")]
    LedgerConflict,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),
}

// SQLITE_CONSTRAINT_UNIQUE (2067) covers the transactions idempotency key;
// SQLITE_CONSTRAINT_PRIMARYKEY (1555) covers the entitlements composite key.
impl From<rusqlite::Error> for AccessError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref err, _) = e {
            if err.extended_code == 2067 || err.extended_code == 1555 {
                return AccessError::LedgerConflict;
            }
        }
        AccessError::Database(e)
    }
}
