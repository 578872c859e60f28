//! Entitlement and transaction ledger.
//!
//! Append-only: rows are created exactly once and never updated or deleted
//! by this subsystem. All concurrency coordination lives in the storage
//! uniqueness constraints (`(caller_id, resource_id)` for entitlements,
//! `idempotency_key` for transactions), not in in-process locks, so a
//! retried or racing submission collapses into [`AccessError::LedgerConflict`]
//! instead of a duplicate row.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::AccessError;
use crate::verifier::{TxStatus, VerifiedPayment};

/// Durable grant of access for one caller to one resource.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub caller_id: String,
    pub resource_id: String,
    pub created_at: i64,
}

/// A completed payment, recorded alongside the entitlement it purchased.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub id: i64,
    pub resource_id: String,
    pub caller_id: String,
    pub amount_cents: u64,
    pub currency: String,
    pub recipient: String,
    pub network: String,
    pub tx_ref: String,
    pub idempotency_key: String,
    pub status: TxStatus,
    pub created_at: i64,
}

/// Result of a successful [`Ledger::record_payment`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedPayment {
    pub entitlement: Entitlement,
    pub transaction: LedgerTransaction,
}

/// Input to [`Ledger::record_payment`]. Amount, currency, and recipient come
/// from the server-held resource record; identifiers come from the verifier.
#[derive(Debug, Clone, Copy)]
pub struct NewPayment<'a> {
    pub caller_id: &'a str,
    pub resource_id: &'a str,
    pub amount_cents: u64,
    pub currency: &'a str,
    pub recipient: &'a str,
    pub network: &'a str,
    pub payment: &'a VerifiedPayment,
}

/// Ledger storage backend.
pub trait Ledger: Send + Sync {
    fn is_entitled(&self, caller_id: &str, resource_id: &str) -> Result<bool, AccessError>;

    /// Atomically create the Transaction and Entitlement rows.
    ///
    /// Either both rows land or neither does. A uniqueness conflict on either
    /// constraint rolls the whole write back and returns
    /// [`AccessError::LedgerConflict`].
    fn record_payment(&self, new: NewPayment<'_>) -> Result<RecordedPayment, AccessError>;
}

/// SQLite-backed ledger. Survives restarts; safe across processes.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    pub fn open(path: &str) -> Result<Self, AccessError> {
        let conn = Connection::open(path)?;
        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    fn init_schema(&self) -> Result<(), AccessError> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS entitlements (
                caller_id   TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                created_at  INTEGER NOT NULL,
                PRIMARY KEY (caller_id, resource_id)
            );

            CREATE TABLE IF NOT EXISTS transactions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id     TEXT NOT NULL,
                caller_id       TEXT NOT NULL,
                amount_cents    INTEGER NOT NULL,
                currency        TEXT NOT NULL,
                recipient       TEXT NOT NULL,
                network         TEXT NOT NULL,
                tx_ref          TEXT NOT NULL,
                idempotency_key TEXT UNIQUE NOT NULL,
                status          TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_caller
                ON transactions(caller_id, resource_id);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AccessError> {
        self.conn
            .lock()
            .map_err(|_| AccessError::Internal("ledger lock poisoned".to_string()))
    }

    /// Look up a transaction by its idempotency key.
    pub fn find_transaction(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<LedgerTransaction>, AccessError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                r#"
                SELECT id, resource_id, caller_id, amount_cents, currency, recipient,
                       network, tx_ref, idempotency_key, status, created_at
                FROM transactions
                WHERE idempotency_key = ?1
                "#,
                params![idempotency_key],
                map_transaction_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn transaction_count(&self) -> Result<i64, AccessError> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn entitlement_count(&self) -> Result<i64, AccessError> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM entitlements", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn map_transaction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerTransaction> {
    let status_str: String = row.get(9)?;
    let status = TxStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            format!("unknown transaction status: {status_str}").into(),
        )
    })?;

    Ok(LedgerTransaction {
        id: row.get(0)?,
        resource_id: row.get(1)?,
        caller_id: row.get(2)?,
        amount_cents: row.get::<_, i64>(3)? as u64,
        currency: row.get(4)?,
        recipient: row.get(5)?,
        network: row.get(6)?,
        tx_ref: row.get(7)?,
        idempotency_key: row.get(8)?,
        status,
        created_at: row.get(10)?,
    })
}

impl Ledger for SqliteLedger {
    fn is_entitled(&self, caller_id: &str, resource_id: &str) -> Result<bool, AccessError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entitlements WHERE caller_id = ?1 AND resource_id = ?2",
            params![caller_id, resource_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn record_payment(&self, new: NewPayment<'_>) -> Result<RecordedPayment, AccessError> {
        let conn = self.lock()?;
        let now = chrono::Utc::now().timestamp();

        // Both inserts in one transaction: a constraint violation on either
        // rolls the whole write back (the `?` drops `tx`, which aborts).
        let tx = conn.unchecked_transaction().map_err(AccessError::from)?;

        tx.execute(
            r#"
            INSERT INTO transactions
                (resource_id, caller_id, amount_cents, currency, recipient,
                 network, tx_ref, idempotency_key, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                new.resource_id,
                new.caller_id,
                new.amount_cents as i64,
                new.currency,
                new.recipient,
                new.network,
                new.payment.tx_ref,
                new.payment.idempotency_key,
                new.payment.status.as_str(),
                now
            ],
        )?;
        let tx_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO entitlements (caller_id, resource_id, created_at) VALUES (?1, ?2, ?3)",
            params![new.caller_id, new.resource_id, now],
        )?;

        tx.commit().map_err(AccessError::from)?;

        Ok(RecordedPayment {
            entitlement: Entitlement {
                caller_id: new.caller_id.to_string(),
                resource_id: new.resource_id.to_string(),
                created_at: now,
            },
            transaction: LedgerTransaction {
                id: tx_id,
                resource_id: new.resource_id.to_string(),
                caller_id: new.caller_id.to_string(),
                amount_cents: new.amount_cents,
                currency: new.currency.to_string(),
                recipient: new.recipient.to_string(),
                network: new.network.to_string(),
                tx_ref: new.payment.tx_ref.clone(),
                idempotency_key: new.payment.idempotency_key.clone(),
                status: new.payment.status,
                created_at: now,
            },
        })
    }
}

/// In-memory ledger for dev mode and tests. Lost on restart.
///
/// A single mutex guards both indexes so the dual-constraint check stays
/// atomic, matching the SQLite transaction semantics.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    entitlements: HashMap<(String, String), Entitlement>,
    transactions: HashMap<String, LedgerTransaction>,
    next_id: i64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_count(&self) -> usize {
        self.state.lock().map(|s| s.transactions.len()).unwrap_or(0)
    }

    pub fn entitlement_count(&self) -> usize {
        self.state.lock().map(|s| s.entitlements.len()).unwrap_or(0)
    }
}

impl Ledger for MemoryLedger {
    fn is_entitled(&self, caller_id: &str, resource_id: &str) -> Result<bool, AccessError> {
        let state = self
            .state
            .lock()
            .map_err(|_| AccessError::Internal("ledger lock poisoned".to_string()))?;
        Ok(state
            .entitlements
            .contains_key(&(caller_id.to_string(), resource_id.to_string())))
    }

    fn record_payment(&self, new: NewPayment<'_>) -> Result<RecordedPayment, AccessError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AccessError::Internal("ledger lock poisoned".to_string()))?;

        let pair = (new.caller_id.to_string(), new.resource_id.to_string());
        if state.entitlements.contains_key(&pair)
            || state
                .transactions
                .contains_key(&new.payment.idempotency_key)
        {
            return Err(AccessError::LedgerConflict);
        }

        let now = chrono::Utc::now().timestamp();
        state.next_id += 1;

        let entitlement = Entitlement {
            caller_id: new.caller_id.to_string(),
            resource_id: new.resource_id.to_string(),
            created_at: now,
        };
        let transaction = LedgerTransaction {
            id: state.next_id,
            resource_id: new.resource_id.to_string(),
            caller_id: new.caller_id.to_string(),
            amount_cents: new.amount_cents,
            currency: new.currency.to_string(),
            recipient: new.recipient.to_string(),
            network: new.network.to_string(),
            tx_ref: new.payment.tx_ref.clone(),
            idempotency_key: new.payment.idempotency_key.clone(),
            status: new.payment.status,
            created_at: now,
        };

        state.entitlements.insert(pair, entitlement.clone());
        state
            .transactions
            .insert(new.payment.idempotency_key.clone(), transaction.clone());

        Ok(RecordedPayment {
            entitlement,
            transaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified(key: &str) -> VerifiedPayment {
        VerifiedPayment {
            tx_ref: format!("0xtx-{key}"),
            idempotency_key: key.to_string(),
            payer: Some("0xpayer".to_string()),
            status: TxStatus::Confirmed,
        }
    }

    fn payment<'a>(
        caller: &'a str,
        resource: &'a str,
        verified: &'a VerifiedPayment,
    ) -> NewPayment<'a> {
        NewPayment {
            caller_id: caller,
            resource_id: resource,
            amount_cents: 500,
            currency: "USDC",
            recipient: "0xrecv",
            network: "base",
            payment: verified,
        }
    }

    #[test]
    fn sqlite_record_creates_both_rows() {
        let ledger = SqliteLedger::open(":memory:").unwrap();
        let v = verified("key-1");

        assert!(!ledger.is_entitled("alice", "trk-1").unwrap());
        let recorded = ledger.record_payment(payment("alice", "trk-1", &v)).unwrap();

        assert!(ledger.is_entitled("alice", "trk-1").unwrap());
        assert_eq!(ledger.transaction_count().unwrap(), 1);
        assert_eq!(ledger.entitlement_count().unwrap(), 1);
        assert_eq!(recorded.transaction.amount_cents, 500);
        assert_eq!(recorded.transaction.status, TxStatus::Confirmed);
    }

    #[test]
    fn sqlite_duplicate_idempotency_key_conflicts() {
        let ledger = SqliteLedger::open(":memory:").unwrap();
        let v = verified("key-1");

        ledger.record_payment(payment("alice", "trk-1", &v)).unwrap();
        let err = ledger
            .record_payment(payment("bob", "trk-2", &v))
            .unwrap_err();

        assert!(matches!(err, AccessError::LedgerConflict));
        assert_eq!(ledger.transaction_count().unwrap(), 1);
        assert_eq!(ledger.entitlement_count().unwrap(), 1);
        assert!(!ledger.is_entitled("bob", "trk-2").unwrap());
    }

    #[test]
    fn sqlite_duplicate_entitlement_rolls_back_transaction_row() {
        let ledger = SqliteLedger::open(":memory:").unwrap();
        let first = verified("key-1");
        let second = verified("key-2");

        ledger
            .record_payment(payment("alice", "trk-1", &first))
            .unwrap();

        // Fresh idempotency key, same (caller, resource): the entitlement
        // insert fails and the already-applied transaction insert must roll
        // back with it.
        let err = ledger
            .record_payment(payment("alice", "trk-1", &second))
            .unwrap_err();

        assert!(matches!(err, AccessError::LedgerConflict));
        assert_eq!(ledger.transaction_count().unwrap(), 1);
        assert!(ledger.find_transaction("key-2").unwrap().is_none());
    }

    #[test]
    fn sqlite_find_transaction_returns_recorded_fields() {
        let ledger = SqliteLedger::open(":memory:").unwrap();
        let v = VerifiedPayment {
            tx_ref: "0xsettled".to_string(),
            idempotency_key: "key-9".to_string(),
            payer: None,
            status: TxStatus::Completed,
        };

        ledger.record_payment(payment("carol", "vlt-3", &v)).unwrap();

        let tx = ledger.find_transaction("key-9").unwrap().unwrap();
        assert_eq!(tx.resource_id, "vlt-3");
        assert_eq!(tx.caller_id, "carol");
        assert_eq!(tx.tx_ref, "0xsettled");
        assert_eq!(tx.status, TxStatus::Completed);
        assert!(ledger.find_transaction("key-unknown").unwrap().is_none());
    }

    #[test]
    fn sqlite_ledger_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();
        let v = verified("key-1");

        {
            let ledger = SqliteLedger::open(path).unwrap();
            ledger.record_payment(payment("alice", "trk-1", &v)).unwrap();
        }

        let ledger = SqliteLedger::open(path).unwrap();
        assert!(ledger.is_entitled("alice", "trk-1").unwrap());
        assert_eq!(ledger.transaction_count().unwrap(), 1);
    }

    #[test]
    fn memory_ledger_matches_sqlite_semantics() {
        let ledger = MemoryLedger::new();
        let first = verified("key-1");
        let second = verified("key-2");

        ledger
            .record_payment(payment("alice", "trk-1", &first))
            .unwrap();
        assert!(ledger.is_entitled("alice", "trk-1").unwrap());

        // Replayed key.
        let err = ledger
            .record_payment(payment("bob", "trk-2", &first))
            .unwrap_err();
        assert!(matches!(err, AccessError::LedgerConflict));

        // Same pair, fresh key.
        let err = ledger
            .record_payment(payment("alice", "trk-1", &second))
            .unwrap_err();
        assert!(matches!(err, AccessError::LedgerConflict));

        assert_eq!(ledger.transaction_count(), 1);
        assert_eq!(ledger.entitlement_count(), 1);
    }
}
