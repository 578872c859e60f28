use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use trackvault::{ProtectedResource, ResourceKind};

use crate::error::ApiError;

/// Catalog store. Resource metadata is owned by the surrounding catalog
/// system; `upsert_resource` is the narrow interface it writes through, and
/// the access routes only read.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), ApiError> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS resources (
                id               TEXT PRIMARY KEY,
                kind             TEXT NOT NULL,
                title            TEXT NOT NULL,
                is_paid          INTEGER NOT NULL DEFAULT 0,
                price_cents      INTEGER,
                currency         TEXT NOT NULL DEFAULT 'USDC',
                receiver_address TEXT NOT NULL DEFAULT '',
                object_key       TEXT NOT NULL,
                created_at       INTEGER NOT NULL,
                updated_at       INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_resources_kind ON resources(kind);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.conn
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }

    pub fn get_resource(&self, id: &str) -> Result<Option<ProtectedResource>, ApiError> {
        let conn = self.lock()?;
        let resource = conn
            .query_row(
                r#"
                SELECT id, kind, title, is_paid, price_cents, currency, receiver_address, object_key
                FROM resources
                WHERE id = ?1
                "#,
                params![id],
                map_resource_row,
            )
            .optional()?;
        Ok(resource)
    }

    pub fn upsert_resource(&self, resource: &ProtectedResource) -> Result<(), ApiError> {
        let conn = self.lock()?;
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            r#"
            INSERT INTO resources
                (id, kind, title, is_paid, price_cents, currency, receiver_address,
                 object_key, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ON CONFLICT(id) DO UPDATE SET
                kind = ?2, title = ?3, is_paid = ?4, price_cents = ?5,
                currency = ?6, receiver_address = ?7, object_key = ?8, updated_at = ?9
            "#,
            params![
                resource.id,
                resource.kind.as_str(),
                resource.title,
                resource.is_paid as i32,
                resource.price_cents.map(|c| c as i64),
                resource.currency,
                resource.receiver_address,
                resource.object_key,
                now
            ],
        )?;
        Ok(())
    }

    pub fn list_resources(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ProtectedResource>, ApiError> {
        let limit = limit.clamp(1, 500);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, kind, title, is_paid, price_cents, currency, receiver_address, object_key
            FROM resources
            ORDER BY created_at DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;
        let resources = stmt
            .query_map(params![limit, offset], map_resource_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resources)
    }
}

fn map_resource_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProtectedResource> {
    let kind_str: String = row.get(1)?;
    let kind = ResourceKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown resource kind: {kind_str}").into(),
        )
    })?;

    Ok(ProtectedResource {
        id: row.get(0)?,
        kind,
        title: row.get(2)?,
        is_paid: row.get::<_, i32>(3)? == 1,
        price_cents: row.get::<_, Option<i64>>(4)?.map(|c| c as u64),
        currency: row.get(5)?,
        receiver_address: row.get(6)?,
        object_key: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, price_cents: Option<u64>) -> ProtectedResource {
        ProtectedResource {
            id: id.to_string(),
            kind: ResourceKind::Track,
            title: "Test Track".to_string(),
            is_paid: price_cents.is_some(),
            price_cents,
            currency: "USDC".to_string(),
            receiver_address: "0xrecv".to_string(),
            object_key: format!("tracks/{id}.mp3"),
        }
    }

    #[test]
    fn upsert_and_get_resource() {
        let db = Database::new(":memory:").unwrap();
        db.upsert_resource(&track("trk-1", Some(500))).unwrap();

        let fetched = db.get_resource("trk-1").unwrap().unwrap();
        assert_eq!(fetched.kind, ResourceKind::Track);
        assert!(fetched.is_paid);
        assert_eq!(fetched.price_cents, Some(500));
        assert_eq!(fetched.receiver_address, "0xrecv");

        assert!(db.get_resource("trk-missing").unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let db = Database::new(":memory:").unwrap();
        db.upsert_resource(&track("trk-1", Some(500))).unwrap();
        db.upsert_resource(&track("trk-1", Some(900))).unwrap();

        let fetched = db.get_resource("trk-1").unwrap().unwrap();
        assert_eq!(fetched.price_cents, Some(900));
        assert_eq!(db.list_resources(100, 0).unwrap().len(), 1);
    }

    #[test]
    fn free_resource_roundtrip() {
        let db = Database::new(":memory:").unwrap();
        db.upsert_resource(&track("trk-free", None)).unwrap();

        let fetched = db.get_resource("trk-free").unwrap().unwrap();
        assert!(!fetched.is_paid);
        assert_eq!(fetched.price_cents, None);
    }
}
