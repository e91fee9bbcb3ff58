//! # Movement Log
//!
//! Append-only audit trail in `movimientos`.
//!
//! ## Best-Effort Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout commit ──► record(VENTA_REGISTRADA) ──► true / false          │
//! │                            │                                            │
//! │                            ├── "database is locked"? sleep, retry       │
//! │                            │   (max_retries, fixed delay)               │
//! │                            │                                            │
//! │                            └── any other error / retries exhausted      │
//! │                                → warn!, return false                    │
//! │                                                                         │
//! │  The caller never fails because the log failed.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use inventario_core::{ActionCode, MovementEntry};
use serde_json::Value;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::now_timestamp;

/// Writer and reader for the movement log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    pool: SqlitePool,
    max_retries: u32,
    retry_delay: Duration,
}

impl AuditLog {
    /// Creates a log with the default retry policy (5 retries, 120 ms apart).
    pub fn new(pool: SqlitePool) -> Self {
        AuditLog {
            pool,
            max_retries: 5,
            retry_delay: Duration::from_millis(120),
        }
    }

    /// Overrides the retry policy.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Appends one entry.
    ///
    /// ## Arguments
    /// * `actor` - Acting user, if known
    /// * `action` - Action code
    /// * `row_id` - Inventory item touched, if any
    /// * `sku` - SKU (or category prefix for category-wide actions)
    /// * `details` - Free-form detail blob, stored as JSON text
    ///
    /// ## Returns
    /// `true` if the entry was written. Never errors.
    pub async fn record(
        &self,
        actor: Option<&str>,
        action: ActionCode,
        row_id: Option<i64>,
        sku: Option<&str>,
        details: Option<Value>,
    ) -> bool {
        let details = details.map(|d| d.to_string());
        let mut attempt = 0;

        loop {
            let result = sqlx::query(
                r#"
                INSERT INTO movimientos (usuario, accion, rowid_producto, sku, detalles, cuando)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(actor)
            .bind(action.as_str())
            .bind(row_id)
            .bind(sku)
            .bind(details.as_deref())
            .bind(now_timestamp())
            .execute(&self.pool)
            .await
            .map_err(crate::error::DbError::from);

            match result {
                Ok(_) => {
                    debug!(action = %action, row_id = ?row_id, "Movement recorded");
                    return true;
                }
                Err(e) if e.is_lock_contention() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(action = %action, attempt, "Movement log locked, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    warn!(action = %action, row_id = ?row_id, error = %e, "Could not record movement");
                    return false;
                }
            }
        }
    }

    /// Returns the latest entries, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<MovementEntry>> {
        let entries = sqlx::query_as::<_, MovementEntry>(
            r#"
            SELECT
                id,
                CAST(usuario AS TEXT) AS actor,
                CAST(accion AS TEXT) AS action,
                CAST(rowid_producto AS INTEGER) AS row_id,
                CAST(sku AS TEXT) AS sku,
                CAST(detalles AS TEXT) AS details,
                CAST(cuando AS TEXT) AS at
            FROM movimientos
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let log = db.audit();

        assert!(log.record(Some("ana"), ActionCode::CrearEvento, None, None, Some(json!({"fecha_evento": "2024-05-01"}))).await);
        assert!(log.record(None, ActionCode::Donado, Some(42), Some("CPU-12"), None).await);

        let entries = log.recent(200).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "DONADO");
        assert_eq!(entries[0].row_id, Some(42));
        assert_eq!(entries[0].details, None);
        assert_eq!(entries[1].actor.as_deref(), Some("ana"));
        assert_eq!(entries[1].details_value()["fecha_evento"], "2024-05-01");
    }

    #[tokio::test]
    async fn test_failure_returns_false() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("DROP TABLE movimientos").execute(db.pool()).await.unwrap();

        assert!(!db.audit().record(None, ActionCode::Entrada, Some(1), None, None).await);
    }

    #[tokio::test]
    async fn test_retries_while_file_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.db");
        let holder = Database::new(DbConfig::new(&path)).await.unwrap();
        let writer = Database::new(
            DbConfig::new(&path)
                .busy_timeout(Duration::ZERO)
                .audit_retries(5, Duration::from_millis(40)),
        )
        .await
        .unwrap();

        let mut conn = holder.pool().acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await.unwrap();
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            sqlx::query("COMMIT").execute(&mut *conn).await.unwrap();
        });

        assert!(writer.audit().record(None, ActionCode::Entrada, Some(1), None, None).await);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.db");
        let holder = Database::new(DbConfig::new(&path)).await.unwrap();
        let writer = Database::new(
            DbConfig::new(&path)
                .busy_timeout(Duration::ZERO)
                .audit_retries(2, Duration::from_millis(5)),
        )
        .await
        .unwrap();

        let mut conn = holder.pool().acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await.unwrap();

        assert!(!writer.audit().record(None, ActionCode::Entrada, Some(1), None, None).await);

        sqlx::query("ROLLBACK").execute(&mut *conn).await.unwrap();
    }
}
