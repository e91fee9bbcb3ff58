//! # Sale-Event Repository
//!
//! Day-scoped sale sessions in `venta_eventos` and item staging in
//! `venta_evento_items`.
//!
//! ## Day Rollover
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    ensure_today() on 2024-05-02                         │
//! │                                                                         │
//! │  venta_eventos                         venta_eventos                    │
//! │  ┌────────────┬─────────┐              ┌────────────┬─────────┐         │
//! │  │ 2024-04-30 │ CERRADA │              │ 2024-04-30 │ CERRADA │         │
//! │  │ 2024-05-01 │ OPEN    │   ──────►    │ 2024-05-01 │ CERRADA │ AUTO    │
//! │  └────────────┴─────────┘              │ 2024-05-02 │ OPEN    │ CREAR   │
//! │                                        └────────────┴─────────┘         │
//! │                                                                         │
//! │  At most one OPEN event, and it is never dated before today.           │
//! │  read_today() closes stale events the same way but never creates.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use inventario_core::validation::event_key;
use inventario_core::{
    ActionCode, CoreError, EventState, Money, SaleEvent, StagedItem, TodaySummary,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::audit::AuditLog;
use super::inventory::InventoryRepository;
use crate::error::DbResult;
use crate::{now_timestamp, today};

/// Result of a manual close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The event was open and is now closed.
    Closed,
    /// The event was already closed; nothing changed.
    AlreadyClosed,
}

/// Items staged into an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedReport {
    pub event: SaleEvent,
    pub items: Vec<StagedItem>,
    /// Sum of the items' current inventory prices.
    pub total_price_cents: i64,
}

const EVENT_COLUMNS: &str = r#"
    CAST(fecha AS TEXT) AS date,
    estado AS state,
    CAST(creado_cuando AS TEXT) AS created_at,
    CAST(cerrado_cuando AS TEXT) AS closed_at
"#;

/// Repository for sale events.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
    audit: AuditLog,
}

impl EventRepository {
    /// Creates a new EventRepository.
    pub fn new(pool: SqlitePool, audit: AuditLog) -> Self {
        EventRepository { pool, audit }
    }

    /// Gets the event for a date.
    pub async fn get(&self, date: &str) -> DbResult<Option<SaleEvent>> {
        let sql = format!("SELECT {} FROM venta_eventos WHERE fecha = ?1", EVENT_COLUMNS);
        let event = sqlx::query_as::<_, SaleEvent>(&sql)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    /// Closes every OPEN event dated before `today`, returning their dates.
    async fn close_stale(conn: &mut SqliteConnection, today: &str) -> DbResult<Vec<String>> {
        let stale: Vec<String> = sqlx::query_scalar(
            "SELECT CAST(fecha AS TEXT) FROM venta_eventos WHERE estado = ?1 AND fecha < ?2 ORDER BY fecha",
        )
        .bind(EventState::Open.as_str())
        .bind(today)
        .fetch_all(&mut *conn)
        .await?;

        if !stale.is_empty() {
            sqlx::query(
                "UPDATE venta_eventos SET estado = ?1, cerrado_cuando = ?2 WHERE estado = ?3 AND fecha < ?4",
            )
            .bind(EventState::Closed.as_str())
            .bind(now_timestamp())
            .bind(EventState::Open.as_str())
            .bind(today)
            .execute(&mut *conn)
            .await?;
        }

        Ok(stale)
    }

    async fn audit_auto_closed(&self, dates: &[String], actor: Option<&str>) {
        for date in dates {
            info!(date = %date, "Auto-closed stale sale event");
            self.audit
                .record(actor, ActionCode::CerrarEventoAuto, None, None, Some(json!({ "fecha_evento": date })))
                .await;
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns the event for `today`, creating it OPEN if absent.
    ///
    /// Stale OPEN events are closed first. Idempotent.
    pub async fn ensure_for(&self, today: NaiveDate, actor: Option<&str>) -> DbResult<SaleEvent> {
        let key = event_key(today);
        let mut tx = self.pool.begin().await?;

        let closed = Self::close_stale(&mut tx, &key).await?;

        let created = sqlx::query(
            "INSERT OR IGNORE INTO venta_eventos (fecha, estado, creado_cuando) VALUES (?1, ?2, ?3)",
        )
        .bind(&key)
        .bind(EventState::Open.as_str())
        .bind(now_timestamp())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        let sql = format!("SELECT {} FROM venta_eventos WHERE fecha = ?1", EVENT_COLUMNS);
        let event = sqlx::query_as::<_, SaleEvent>(&sql)
            .bind(&key)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        self.audit_auto_closed(&closed, actor).await;
        if created {
            info!(date = %key, "Created sale event");
            self.audit
                .record(actor, ActionCode::CrearEvento, None, None, Some(json!({ "fecha_evento": key })))
                .await;
        }

        Ok(event)
    }

    /// [`ensure_for`](Self::ensure_for) with the local date.
    pub async fn ensure_today(&self, actor: Option<&str>) -> DbResult<SaleEvent> {
        self.ensure_for(today(), actor).await
    }

    /// Reads the event for `today` without creating it.
    ///
    /// Stale OPEN events are still closed. The sold total is only computed
    /// when the event exists, and reads as zero if the sum fails.
    pub async fn read_for(&self, today: NaiveDate, actor: Option<&str>) -> DbResult<TodaySummary> {
        let key = event_key(today);

        let mut tx = self.pool.begin().await?;
        let closed = Self::close_stale(&mut tx, &key).await?;
        tx.commit().await?;
        self.audit_auto_closed(&closed, actor).await;

        let event = self.get(&key).await?;
        let total_sold_cents = match event {
            Some(_) => self.total_sold(&key).await.unwrap_or_else(|e| {
                warn!(date = %key, error = %e, "Could not total event sales");
                0
            }),
            None => 0,
        };

        Ok(TodaySummary {
            event,
            total_sold_cents,
        })
    }

    /// [`read_for`](Self::read_for) with the local date.
    pub async fn read_today(&self, actor: Option<&str>) -> DbResult<TodaySummary> {
        self.read_for(today(), actor).await
    }

    /// Sum of sale prices recorded under an event date.
    pub async fn total_sold(&self, date: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(CAST(ROUND(CAST(precio_venta AS REAL) * 100) AS INTEGER)) FROM ventas WHERE evento_fecha = ?1",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(0))
    }

    /// Closes the event for `date`.
    ///
    /// ## Returns
    /// * `Ok(Closed)` / `Ok(AlreadyClosed)`
    /// * `Err(Domain(EventNotFound))` - No event on that date
    pub async fn close(&self, date: &str, actor: Option<&str>) -> DbResult<CloseOutcome> {
        let event = self
            .get(date)
            .await?
            .ok_or_else(|| CoreError::EventNotFound(date.to_string()))?;

        if event.state == EventState::Closed {
            return Ok(CloseOutcome::AlreadyClosed);
        }

        sqlx::query("UPDATE venta_eventos SET estado = ?1, cerrado_cuando = ?2 WHERE fecha = ?3")
            .bind(EventState::Closed.as_str())
            .bind(now_timestamp())
            .bind(date)
            .execute(&self.pool)
            .await?;

        info!(date = %date, "Closed sale event");
        self.audit
            .record(actor, ActionCode::CerrarEventoManual, None, None, Some(json!({ "fecha_evento": date })))
            .await;

        Ok(CloseOutcome::Closed)
    }

    /// Opens the event for `today`, creating it if needed and reopening it if
    /// it was closed.
    pub async fn reopen_for(&self, today: NaiveDate, actor: Option<&str>) -> DbResult<SaleEvent> {
        let event = self.ensure_for(today, actor).await?;
        if event.is_open() {
            return Ok(event);
        }

        sqlx::query("UPDATE venta_eventos SET estado = ?1, cerrado_cuando = NULL WHERE fecha = ?2")
            .bind(EventState::Open.as_str())
            .bind(&event.date)
            .execute(&self.pool)
            .await?;

        info!(date = %event.date, "Reopened sale event");
        Ok(SaleEvent {
            state: EventState::Open,
            closed_at: None,
            ..event
        })
    }

    /// [`reopen_for`](Self::reopen_for) with the local date.
    pub async fn reopen_today(&self, actor: Option<&str>) -> DbResult<SaleEvent> {
        self.reopen_for(today(), actor).await
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Stages an item into the event for `today`.
    ///
    /// ## Returns
    /// * `Ok(date)` - The event date (staging twice is a no-op)
    /// * `Err(Domain(EventClosed))` - Today's event is closed
    /// * `Err(Domain(ItemNotFound | ItemUnavailable))`
    pub async fn stage_item_for(
        &self,
        today: NaiveDate,
        row_id: i64,
        price: Option<Money>,
        actor: Option<&str>,
    ) -> DbResult<String> {
        let event = self.ensure_for(today, actor).await?;
        if !event.is_open() {
            return Err(CoreError::EventClosed { date: event.date }.into());
        }

        let item = InventoryRepository::new(self.pool.clone(), self.audit.clone())
            .require(row_id)
            .await?;
        if let Some(status) = item.unavailable_status() {
            return Err(CoreError::ItemUnavailable {
                sku: item.sku,
                status: status.to_string(),
            }
            .into());
        }

        let stored = price.map(|p| p.as_stored());
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO venta_evento_items
                (evento_fecha, rowid_producto, precio_asignado, agregado_por, agregado_cuando)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&event.date)
        .bind(row_id)
        .bind(stored)
        .bind(actor)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(date = %event.date, row_id, inserted, "Staged item");

        self.audit
            .record(
                actor,
                ActionCode::EventoAgregar,
                Some(row_id),
                Some(&item.sku),
                Some(json!({ "fecha_evento": event.date, "precio_evento": stored })),
            )
            .await;

        Ok(event.date)
    }

    /// [`stage_item_for`](Self::stage_item_for) with the local date.
    pub async fn stage_item(&self, row_id: i64, price: Option<Money>, actor: Option<&str>) -> DbResult<String> {
        self.stage_item_for(today(), row_id, price, actor).await
    }

    /// Lists the items staged into the event for `date`, ordered by SKU.
    pub async fn staged_items(&self, date: &str) -> DbResult<StagedReport> {
        let event = self
            .get(date)
            .await?
            .ok_or_else(|| CoreError::EventNotFound(date.to_string()))?;

        let items = sqlx::query_as::<_, StagedItem>(
            r#"
            SELECT
                i.rowid AS row_id,
                COALESCE(CAST(i.sku AS TEXT), '') AS sku,
                CAST(i.marca AS TEXT) AS brand,
                CAST(i.modelo AS TEXT) AS model,
                CAST(ROUND(CAST(i.precio AS REAL) * 100) AS INTEGER) AS price_cents,
                CAST(ROUND(CAST(e.precio_asignado AS REAL) * 100) AS INTEGER) AS assigned_price_cents,
                CAST(e.agregado_por AS TEXT) AS added_by,
                CAST(e.agregado_cuando AS TEXT) AS added_at
            FROM venta_evento_items e
            JOIN inventory i ON i.rowid = e.rowid_producto
            WHERE e.evento_fecha = ?1
            ORDER BY i.sku
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        let total_price_cents = Money::sum_cents(items.iter().map(|i| i.price_cents)).cents();

        Ok(StagedReport {
            event,
            items,
            total_price_cents,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let db = database().await;
        let events = db.events();

        let first = events.ensure_for(day("2024-05-01"), Some("ana")).await.unwrap();
        let second = events.ensure_for(day("2024-05-01"), Some("ana")).await.unwrap();

        assert_eq!(first, second);
        assert!(first.is_open());
        assert_eq!(count(db.pool(), "venta_eventos").await, 1);
        assert_eq!(actions(db.pool()).await, vec!["CREAR_EVENTO"]);
    }

    #[tokio::test]
    async fn test_stale_open_event_is_closed_on_ensure() {
        let db = database().await;
        insert_event(db.pool(), "2024-04-30", "OPEN").await;

        db.events().ensure_for(day("2024-05-01"), None).await.unwrap();

        let stale = db.events().get("2024-04-30").await.unwrap().unwrap();
        assert_eq!(stale.state, EventState::Closed);
        assert!(stale.closed_at.is_some());
        assert_eq!(actions(db.pool()).await, vec!["CERRAR_EVENTO_AUTO", "CREAR_EVENTO"]);
    }

    #[tokio::test]
    async fn test_read_closes_stale_but_never_creates() {
        let db = database().await;
        insert_event(db.pool(), "2024-04-30", "OPEN").await;

        let summary = db.events().read_for(day("2024-05-01"), None).await.unwrap();

        assert!(summary.event.is_none());
        assert_eq!(summary.total_sold_cents, 0);
        assert_eq!(count(db.pool(), "venta_eventos").await, 1);
        let stale = db.events().get("2024-04-30").await.unwrap().unwrap();
        assert_eq!(stale.state, EventState::Closed);
    }

    #[tokio::test]
    async fn test_read_reports_total_sold() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        sqlx::query("INSERT INTO ventas (sku, precio_venta, evento_fecha) VALUES ('A-1', 100.0, '2024-05-01'), ('A-2', 50.5, '2024-05-01'), ('A-3', 7.0, '2024-04-01')")
            .execute(db.pool())
            .await
            .unwrap();

        let summary = db.events().read_for(day("2024-05-01"), None).await.unwrap();

        assert!(summary.event.unwrap().is_open());
        assert_eq!(summary.total_sold_cents, 15050);
    }

    #[tokio::test]
    async fn test_close_outcomes() {
        let db = database().await;
        let events = db.events();
        insert_event(db.pool(), "2024-05-01", "OPEN").await;

        assert_eq!(events.close("2024-05-01", None).await.unwrap(), CloseOutcome::Closed);
        assert_eq!(events.close("2024-05-01", None).await.unwrap(), CloseOutcome::AlreadyClosed);
        let err = events.close("2024-06-01", None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EventNotFound(_))));
        assert_eq!(actions(db.pool()).await, vec!["CERRAR_EVENTO_MANUAL"]);
    }

    #[tokio::test]
    async fn test_reopen_clears_closing_timestamp() {
        let db = database().await;
        let events = db.events();
        events.ensure_for(day("2024-05-01"), None).await.unwrap();
        events.close("2024-05-01", None).await.unwrap();

        let reopened = events.reopen_for(day("2024-05-01"), None).await.unwrap();

        assert!(reopened.is_open());
        let stored = events.get("2024-05-01").await.unwrap().unwrap();
        assert_eq!(stored.state, EventState::Open);
        assert_eq!(stored.closed_at, None);
    }

    #[tokio::test]
    async fn test_stage_item() {
        let db = database().await;
        let events = db.events();
        let listed = insert_item(db.pool(), "CPU-1", Some("VENTA"), Some(100.0)).await;
        let sold = insert_item(db.pool(), "CPU-2", Some("VENDIDO"), Some(80.0)).await;

        let date = events
            .stage_item_for(day("2024-05-01"), listed, Some(Money::from_cents(9000)), Some("ana"))
            .await
            .unwrap();
        events.stage_item_for(day("2024-05-01"), listed, None, None).await.unwrap();
        assert_eq!(date, "2024-05-01");
        assert_eq!(count(db.pool(), "venta_evento_items").await, 1);

        let err = events.stage_item_for(day("2024-05-01"), sold, None, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemUnavailable { .. })));

        let err = events.stage_item_for(day("2024-05-01"), 999, None, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemNotFound(999))));

        let report = events.staged_items("2024-05-01").await.unwrap();
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].assigned_price_cents, Some(9000));
        assert_eq!(report.total_price_cents, 10000);
    }

    #[tokio::test]
    async fn test_stage_into_closed_event_is_rejected() {
        let db = database().await;
        let item = insert_item(db.pool(), "CPU-1", None, None).await;
        insert_event(db.pool(), "2024-05-01", "CERRADA").await;

        let err = db.events().stage_item_for(day("2024-05-01"), item, None, None).await.unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::EventClosed { .. })));
    }

    #[tokio::test]
    async fn test_staged_items_requires_event() {
        let db = database().await;
        let err = db.events().staged_items("2024-05-01").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EventNotFound(_))));
    }
}
