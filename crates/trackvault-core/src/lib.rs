//! Pay-per-access protocol for protected media resources.
//!
//! Gates streamable tracks and downloadable vault assets behind an HTTP 402
//! flow: a caller either holds a standing [`ledger::Entitlement`], or must
//! present proof of payment matching a server-issued [`PaymentChallenge`].
//!
//! # Access model
//!
//! - **Gate** ([`ResourceGate`]) — the decision state machine: free pass,
//!   already entitled, challenge, verify-and-grant, or deny
//! - **Verifier** ([`PaymentVerifier`]) — opaque capability that turns a
//!   caller-submitted proof into a trusted yes/no plus transaction identifiers
//! - **Ledger** ([`Ledger`]) — durable, append-only record of entitlements and
//!   payment transactions; uniqueness constraints make retries idempotent
//!
//! # Quick example
//!
//! ```no_run
//! use trackvault::{GateConfig, MemoryLedger, ResourceGate};
//!
//! # async fn run(resource: trackvault::ProtectedResource,
//! #              verifier: impl trackvault::PaymentVerifier,
//! #              urls: impl trackvault::AccessUrlIssuer) {
//! let gate = ResourceGate::new(MemoryLedger::new(), verifier, urls);
//! let config = GateConfig::new(true);
//!
//! let grant = gate
//!     .request_access(&config, &resource, Some("user-1"), None)
//!     .await;
//! # }
//! ```

pub mod challenge;
pub mod constants;
pub mod error;
pub mod gate;
pub mod hmac;
pub mod ledger;
pub mod proof;
pub mod resource;
pub mod security;
pub mod verifier;

pub use challenge::{build_challenge, format_cents, PaymentChallenge};
pub use constants::*;
pub use error::AccessError;
pub use gate::{AccessDecision, AccessGrant, AccessUrlIssuer, GateConfig, ResourceGate};
pub use ledger::{
    Entitlement, Ledger, LedgerTransaction, MemoryLedger, NewPayment, RecordedPayment,
    SqliteLedger,
};
pub use proof::PaymentProof;
pub use resource::{ProtectedResource, ResourceKind};
pub use verifier::{
    HttpVerifier, PaymentVerifier, TxStatus, VerifiedPayment, VerifyOutcome, VerifyResponse,
};
