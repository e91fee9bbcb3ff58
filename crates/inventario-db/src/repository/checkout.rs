//! # Checkout Repository
//!
//! Single-item checkout, bulk checkout and reversal.
//!
//! ## Bulk Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         checkout_bulk()                                 │
//! │                                                                         │
//! │  1. Validate (no writes yet)                                           │
//! │     ├── lines not empty, buyer present                                 │
//! │     ├── event exists and is OPEN                                       │
//! │     └── every item exists and is not VENDIDO / DONADO / OBSOLETO       │
//! │                                                                         │
//! │  2. BEGIN                                                               │
//! │     ├── INSERT venta_tickets (total = Σ price, total_items = n)        │
//! │     ├── per line: INSERT ventas (item snapshot)                        │
//! │     │            UPDATE inventory SET estado = 'VENDIDO'               │
//! │     │              WHERE rowid = ? AND estado not terminal             │
//! │     │              └── 0 rows? another checkout won → ROLLBACK         │
//! │     └── COMMIT                                                          │
//! │                                                                         │
//! │  3. Audit VENTA_REGISTRADA per item (best-effort)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use inventario_core::validation::{dedup_ids, event_key, optional_text, parse_event_date, require_text};
use inventario_core::{
    ActionCode, CheckoutLine, CheckoutReceipt, CoreError, InventoryItem, ItemStatus, Money,
    ReversedSale, SaleTicket, ValidationError, SYSTEM_ACTOR,
};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::audit::AuditLog;
use super::event::EventRepository;
use super::inventory::InventoryRepository;
use crate::error::{DbError, DbResult};
use crate::now_timestamp;

// =============================================================================
// Requests
// =============================================================================

/// A one-item sale.
#[derive(Debug, Clone)]
pub struct SingleCheckout {
    pub row_id: i64,
    pub buyer: String,
    pub price: Money,
    pub notes: Option<String>,
    /// When given, the event must exist and be OPEN.
    pub event_date: Option<String>,
}

/// A multi-item sale under one event.
#[derive(Debug, Clone)]
pub struct BulkCheckout {
    pub event_date: String,
    pub buyer: String,
    pub notes: Option<String>,
    pub lines: Vec<CheckoutLine>,
}

/// Ticket-level fields shared by every record of one checkout.
struct TicketHeader<'a> {
    buyer: &'a str,
    seller: &'a str,
    notes: Option<&'a str>,
    sold_at: &'a str,
    event_date: Option<&'a str>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for checkout and reversal.
#[derive(Debug, Clone)]
pub struct CheckoutRepository {
    pool: SqlitePool,
    audit: AuditLog,
}

impl CheckoutRepository {
    /// Creates a new CheckoutRepository.
    pub fn new(pool: SqlitePool, audit: AuditLog) -> Self {
        CheckoutRepository { pool, audit }
    }

    fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone(), self.audit.clone())
    }

    fn events(&self) -> EventRepository {
        EventRepository::new(self.pool.clone(), self.audit.clone())
    }

    /// Fails unless the event for `date` exists and is OPEN.
    async fn require_open_event(&self, date: &str) -> DbResult<()> {
        let event = self
            .events()
            .get(date)
            .await?
            .ok_or_else(|| CoreError::EventNotFound(date.to_string()))?;
        if !event.is_open() {
            return Err(CoreError::EventNotOpen { date: event.date }.into());
        }
        Ok(())
    }

    // =========================================================================
    // Single
    // =========================================================================

    /// Sells one item on a new ticket.
    ///
    /// ## Returns
    /// * `Ok(receipt)` - Ticket id and the single record id
    /// * `Err(Domain(ItemNotFound))` - No such item
    /// * `Err(Domain(EventNotFound | EventNotOpen))` - Bad event date
    /// * `Err(Domain(ItemUnavailable))` - Item already sold or out
    pub async fn checkout_single(&self, request: &SingleCheckout, actor: Option<&str>) -> DbResult<CheckoutReceipt> {
        let buyer = require_text("comprador", Some(&request.buyer)).map_err(CoreError::from)?;
        let notes = optional_text(request.notes.as_deref());
        let item = self.inventory().require(request.row_id).await?;

        let event_date = match optional_text(request.event_date.as_deref()) {
            Some(raw) => {
                let date = event_key(parse_event_date(&raw).map_err(CoreError::from)?);
                self.require_open_event(&date).await?;
                Some(date)
            }
            None => None,
        };

        let seller = seller_name(actor);
        let sold_at = now_timestamp();
        let header = TicketHeader {
            buyer: &buyer,
            seller: &seller,
            notes: notes.as_deref(),
            sold_at: &sold_at,
            event_date: event_date.as_deref(),
        };

        let mut tx = self.pool.begin().await?;
        let ticket_id = insert_ticket(&mut tx, &header, request.price, 1).await?;
        let record_id = insert_record(&mut tx, &item, request.price, &header, ticket_id).await?;
        let sold = mark_sold(&mut tx, item.row_id).await?;
        if !sold {
            tx.rollback().await?;
            return Err(self.unavailable(&item).await);
        }
        tx.commit().await?;

        info!(ticket_id, record_id, row_id = item.row_id, "Sale registered");
        self.audit
            .record(
                actor,
                ActionCode::VentaRegistrada,
                Some(item.row_id),
                Some(&item.sku),
                Some(json!({
                    "precio_venta": request.price.as_stored(),
                    "comprador": buyer,
                    "observaciones": notes,
                    "ticket_id": ticket_id,
                })),
            )
            .await;

        Ok(CheckoutReceipt {
            ticket_id,
            record_ids: vec![record_id],
        })
    }

    // =========================================================================
    // Bulk
    // =========================================================================

    /// Sells several items on one ticket, all or nothing.
    ///
    /// ## Returns
    /// * `Ok(receipt)` - Ticket id and one record id per line, in order
    /// * `Err(Domain(EmptyBatch))` - No lines
    /// * `Err(Domain(Validation(InvalidPrice)))` - A zero price, or a total
    ///   beyond what the ticket can hold
    /// * `Err(Domain(EventNotFound | EventNotOpen))`
    /// * `Err(Domain(ItemNotFound | ItemUnavailable))` - Nothing was written
    pub async fn checkout_bulk(&self, request: &BulkCheckout, actor: Option<&str>) -> DbResult<CheckoutReceipt> {
        if request.lines.is_empty() {
            return Err(CoreError::EmptyBatch.into());
        }
        let buyer = require_text("comprador", Some(&request.buyer)).map_err(CoreError::from)?;
        let notes = optional_text(request.notes.as_deref());
        let event_date = event_key(parse_event_date(&request.event_date).map_err(CoreError::from)?);
        let total = bulk_total(&request.lines).map_err(CoreError::from)?;
        self.require_open_event(&event_date).await?;

        let inventory = self.inventory();
        let mut items = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let item = inventory.require(line.row_id).await?;
            if let Some(status) = item.unavailable_status() {
                return Err(CoreError::ItemUnavailable {
                    sku: item.sku,
                    status: status.to_string(),
                }
                .into());
            }
            items.push((item, line.price));
        }

        let seller = seller_name(actor);
        let sold_at = now_timestamp();
        let header = TicketHeader {
            buyer: &buyer,
            seller: &seller,
            notes: notes.as_deref(),
            sold_at: &sold_at,
            event_date: Some(&event_date),
        };

        let mut tx = self.pool.begin().await?;
        let ticket_id = insert_ticket(&mut tx, &header, total, items.len() as i64).await?;
        let mut record_ids = Vec::with_capacity(items.len());
        for (item, price) in &items {
            record_ids.push(insert_record(&mut tx, item, *price, &header, ticket_id).await?);
            if !mark_sold(&mut tx, item.row_id).await? {
                tx.rollback().await?;
                return Err(self.unavailable(item).await);
            }
        }
        tx.commit().await?;

        info!(ticket_id, items = items.len(), total = %total, "Bulk sale registered");
        for (item, price) in &items {
            self.audit
                .record(
                    actor,
                    ActionCode::VentaRegistrada,
                    Some(item.row_id),
                    Some(&item.sku),
                    Some(json!({
                        "precio_venta": price.as_stored(),
                        "comprador": buyer,
                        "ticket_id": ticket_id,
                    })),
                )
                .await;
        }

        Ok(CheckoutReceipt { ticket_id, record_ids })
    }

    /// Builds the error for an item whose conditional status update matched
    /// nothing, reading the status that beat us.
    async fn unavailable(&self, item: &InventoryItem) -> DbError {
        let status = match self.inventory().get(item.row_id).await {
            Ok(Some(current)) => current.status.unwrap_or_default(),
            _ => ItemStatus::Vendido.to_string(),
        };
        warn!(row_id = item.row_id, status = %status, "Item sold concurrently, checkout rolled back");
        CoreError::ItemUnavailable {
            sku: item.sku.clone(),
            status,
        }
        .into()
    }

    // =========================================================================
    // Reversal
    // =========================================================================

    /// Undoes sale records: each item goes back to VENTA and the record is
    /// deleted. Tickets left without records are removed afterwards.
    ///
    /// ## Returns
    /// * `Ok(reversed)` - One entry per distinct id, in request order
    /// * `Err(Domain(SaleNotFound(missing)))` - Any id unknown; nothing changed
    pub async fn reverse(&self, ids: &[i64], actor: Option<&str>) -> DbResult<Vec<ReversedSale>> {
        let ids = dedup_ids(ids);
        if ids.is_empty() {
            return Err(CoreError::from(ValidationError::required("venta_ids")).into());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT id, CAST(rowid_producto AS INTEGER), CAST(sku AS TEXT), CAST(ticket_id AS INTEGER)
            FROM ventas
            WHERE id IN ({})
            "#,
            placeholders
        );

        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query_as::<_, (i64, Option<i64>, Option<String>, Option<i64>)>(&sql);
        for id in &ids {
            query = query.bind(id);
        }
        let found = query.fetch_all(&mut *tx).await?;

        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !found.iter().any(|(found_id, ..)| found_id == id))
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::SaleNotFound(missing).into());
        }

        let mut reversed = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some((record_id, row_id, sku, ticket_id)) = found.iter().find(|(rid, ..)| rid == id).cloned() else {
                continue;
            };
            if let Some(row_id) = row_id {
                sqlx::query("UPDATE inventory SET estado = ?1 WHERE rowid = ?2")
                    .bind(ItemStatus::Venta.as_str())
                    .bind(row_id)
                    .execute(&mut *tx)
                    .await?;
            }
            sqlx::query("DELETE FROM ventas WHERE id = ?1")
                .bind(record_id)
                .execute(&mut *tx)
                .await?;
            reversed.push(ReversedSale {
                record_id,
                row_id,
                sku,
                ticket_id,
            });
        }

        tx.commit().await?;
        info!(records = reversed.len(), "Sales reversed");

        self.remove_empty_tickets(&reversed).await;

        for sale in &reversed {
            self.audit
                .record(
                    actor,
                    ActionCode::VentaRevertida,
                    sale.row_id,
                    sale.sku.as_deref(),
                    Some(json!({ "ticket_id": sale.ticket_id, "venta_id": sale.record_id })),
                )
                .await;
        }

        Ok(reversed)
    }

    /// Deletes touched tickets that no longer own any record. Failures are
    /// logged and ignored.
    async fn remove_empty_tickets(&self, reversed: &[ReversedSale]) {
        let mut tickets: Vec<i64> = reversed.iter().filter_map(|s| s.ticket_id).collect();
        tickets.sort_unstable();
        tickets.dedup();

        for ticket_id in tickets {
            let result = sqlx::query(
                "DELETE FROM venta_tickets WHERE id = ?1 AND NOT EXISTS (SELECT 1 FROM ventas WHERE ticket_id = ?1)",
            )
            .bind(ticket_id)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() > 0 => debug!(ticket_id, "Removed empty ticket"),
                Ok(_) => {}
                Err(e) => warn!(ticket_id, error = %e, "Could not remove empty ticket"),
            }
        }
    }

    /// Gets a ticket row by id.
    pub async fn get_ticket(&self, id: i64) -> DbResult<Option<SaleTicket>> {
        let ticket = sqlx::query_as::<_, SaleTicket>(
            r#"
            SELECT
                id,
                CAST(comprador AS TEXT) AS buyer,
                CAST(vendedor AS TEXT) AS seller,
                CAST(observaciones AS TEXT) AS notes,
                CAST(fecha_venta AS TEXT) AS sold_at,
                CAST(evento_fecha AS TEXT) AS event_date,
                CAST(ROUND(CAST(total AS REAL) * 100) AS INTEGER) AS total_cents,
                CAST(total_items AS INTEGER) AS total_items
            FROM venta_tickets
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

fn seller_name(actor: Option<&str>) -> String {
    optional_text(actor).unwrap_or_else(|| SYSTEM_ACTOR.to_string())
}

async fn insert_ticket(
    conn: &mut SqliteConnection,
    header: &TicketHeader<'_>,
    total: Money,
    total_items: i64,
) -> DbResult<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO venta_tickets
            (comprador, vendedor, observaciones, fecha_venta, evento_fecha, total, total_items)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(header.buyer)
    .bind(header.seller)
    .bind(header.notes)
    .bind(header.sold_at)
    .bind(header.event_date)
    .bind(total.as_stored())
    .bind(total_items)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

async fn insert_record(
    conn: &mut SqliteConnection,
    item: &InventoryItem,
    price: Money,
    header: &TicketHeader<'_>,
    ticket_id: i64,
) -> DbResult<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO ventas
            (rowid_producto, sku, tipo, marca, modelo, no_serie, precio_venta,
             comprador, vendedor, observaciones, fecha_venta, evento_fecha, ticket_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(item.row_id)
    .bind(&item.sku)
    .bind(&item.kind)
    .bind(&item.brand)
    .bind(&item.model)
    .bind(&item.serial_number)
    .bind(price.as_stored())
    .bind(header.buyer)
    .bind(header.seller)
    .bind(header.notes)
    .bind(header.sold_at)
    .bind(header.event_date)
    .bind(ticket_id)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Sets an item VENDIDO unless it is already terminal. Returns whether the
/// row was updated.
async fn mark_sold(conn: &mut SqliteConnection, row_id: i64) -> DbResult<bool> {
    let updated = sqlx::query(
        r#"
        UPDATE inventory SET estado = ?1
        WHERE rowid = ?2
          AND (estado IS NULL OR estado NOT IN (?3, ?4, ?5))
        "#,
    )
    .bind(ItemStatus::Vendido.as_str())
    .bind(row_id)
    .bind(ItemStatus::Vendido.as_str())
    .bind(ItemStatus::Donado.as_str())
    .bind(ItemStatus::Obsoleto.as_str())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(updated > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================

/// Ticket total of a bulk sale. Every line must be priced above zero.
fn bulk_total(lines: &[CheckoutLine]) -> Result<Money, ValidationError> {
    lines.iter().try_fold(Money::zero(), |total, line| {
        if line.price.is_zero() {
            return Err(ValidationError::InvalidPrice {
                value: line.price.as_stored().to_string(),
            });
        }
        total.checked_add(line.price).ok_or_else(|| ValidationError::InvalidPrice {
            value: line.price.as_stored().to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;
    use inventario_core::ListingScope;

    fn single(row_id: i64, price: &str) -> SingleCheckout {
        SingleCheckout {
            row_id,
            buyer: "Ana".into(),
            price: Money::parse(price).unwrap(),
            notes: None,
            event_date: None,
        }
    }

    fn bulk(date: &str, lines: &[(i64, i64)]) -> BulkCheckout {
        BulkCheckout {
            event_date: date.into(),
            buyer: "Luis".into(),
            notes: Some("mayoreo".into()),
            lines: lines
                .iter()
                .map(|&(row_id, cents)| CheckoutLine {
                    row_id,
                    price: Money::from_cents(cents),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_single_checkout_without_event() {
        let db = database().await;
        let item = insert_item(db.pool(), "CPU-42", Some("VENTA"), Some(200.0)).await;

        let receipt = db.checkout().checkout_single(&single(item, "150.50"), None).await.unwrap();

        assert_eq!(receipt.record_ids.len(), 1);
        let ticket = db.checkout().get_ticket(receipt.ticket_id).await.unwrap().unwrap();
        assert_eq!(ticket.total_cents, Some(15050));
        assert_eq!(ticket.total_items, Some(1));
        assert_eq!(ticket.seller.as_deref(), Some(SYSTEM_ACTOR));
        assert_eq!(ticket.event_date, None);
        assert_eq!(item_status(db.pool(), item).await.as_deref(), Some("VENDIDO"));
        assert_eq!(actions(db.pool()).await, vec!["VENTA_REGISTRADA"]);
    }

    #[tokio::test]
    async fn test_single_checkout_checks_event() {
        let db = database().await;
        let item = insert_item(db.pool(), "CPU-1", Some("VENTA"), None).await;
        insert_event(db.pool(), "2024-05-01", "CERRADA").await;

        let mut request = single(item, "10");
        request.event_date = Some("2024-05-01".into());
        let err = db.checkout().checkout_single(&request, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EventNotOpen { .. })));

        request.event_date = Some("2024-06-01".into());
        let err = db.checkout().checkout_single(&request, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EventNotFound(_))));

        assert_eq!(count(db.pool(), "venta_tickets").await, 0);
    }

    #[tokio::test]
    async fn test_single_checkout_validation() {
        let db = database().await;
        let item = insert_item(db.pool(), "CPU-1", Some("VENTA"), None).await;

        let mut request = single(item, "10");
        request.buyer = "   ".into();
        let err = db.checkout().checkout_single(&request, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = db.checkout().checkout_single(&single(999, "10"), None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemNotFound(999))));
    }

    #[tokio::test]
    async fn test_single_checkout_of_sold_item_rolls_back() {
        let db = database().await;
        let item = insert_item(db.pool(), "CPU-1", Some("VENDIDO"), None).await;

        let err = db.checkout().checkout_single(&single(item, "10"), Some("ana")).await.unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ItemUnavailable { ref status, .. }) if status == "VENDIDO"));
        assert_eq!(count(db.pool(), "venta_tickets").await, 0);
        assert_eq!(count(db.pool(), "ventas").await, 0);
    }

    #[tokio::test]
    async fn test_bulk_checkout_writes_one_ticket() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let a = insert_item(db.pool(), "CPU-1", Some("VENTA"), None).await;
        let b = insert_item(db.pool(), "MON-1", None, None).await;

        let receipt = db
            .checkout()
            .checkout_bulk(&bulk("2024-05-01", &[(a, 10000), (b, 5050)]), Some("ana"))
            .await
            .unwrap();

        assert_eq!(receipt.record_ids.len(), 2);
        let ticket = db.checkout().get_ticket(receipt.ticket_id).await.unwrap().unwrap();
        assert_eq!(ticket.total_cents, Some(15050));
        assert_eq!(ticket.total_items, Some(2));
        assert_eq!(ticket.seller.as_deref(), Some("ana"));
        assert_eq!(ticket.event_date.as_deref(), Some("2024-05-01"));
        assert_eq!(item_status(db.pool(), a).await.as_deref(), Some("VENDIDO"));
        assert_eq!(item_status(db.pool(), b).await.as_deref(), Some("VENDIDO"));
        assert_eq!(actions(db.pool()).await, vec!["VENTA_REGISTRADA", "VENTA_REGISTRADA"]);
    }

    #[tokio::test]
    async fn test_bulk_checkout_with_sold_item_writes_nothing() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let a = insert_item(db.pool(), "CPU-1", Some("VENTA"), None).await;
        let b = insert_item(db.pool(), "CPU-2", Some("VENDIDO"), None).await;

        let err = db
            .checkout()
            .checkout_bulk(&bulk("2024-05-01", &[(a, 10000), (b, 100)]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ItemUnavailable { ref sku, .. }) if sku == "CPU-2"));
        assert_eq!(item_status(db.pool(), a).await.as_deref(), Some("VENTA"));
        assert_eq!(count(db.pool(), "venta_tickets").await, 0);
        assert_eq!(count(db.pool(), "ventas").await, 0);
    }

    #[tokio::test]
    async fn test_bulk_checkout_duplicate_line_rolls_back() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let a = insert_item(db.pool(), "CPU-1", Some("VENTA"), None).await;

        let err = db
            .checkout()
            .checkout_bulk(&bulk("2024-05-01", &[(a, 100), (a, 100)]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ItemUnavailable { .. })));
        assert_eq!(item_status(db.pool(), a).await.as_deref(), Some("VENTA"));
        assert_eq!(count(db.pool(), "venta_tickets").await, 0);
        assert_eq!(count(db.pool(), "ventas").await, 0);
    }

    #[tokio::test]
    async fn test_bulk_checkout_rejections() {
        let db = database().await;
        let a = insert_item(db.pool(), "CPU-1", Some("VENTA"), None).await;

        let err = db.checkout().checkout_bulk(&bulk("2024-05-01", &[]), None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyBatch)));

        let err = db.checkout().checkout_bulk(&bulk("", &[(a, 1)]), None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        insert_event(db.pool(), "2024-05-01", "CERRADA").await;
        let err = db.checkout().checkout_bulk(&bulk("2024-05-01", &[(a, 1)]), None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EventNotOpen { .. })));
    }

    #[tokio::test]
    async fn test_bulk_total_overflow_writes_nothing() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let a = insert_item(db.pool(), "CPU-1", Some("VENTA"), None).await;
        let b = insert_item(db.pool(), "CPU-2", Some("VENTA"), None).await;
        let huge = Money::parse("90000000000000000").unwrap().cents();

        let err = db
            .checkout()
            .checkout_bulk(&bulk("2024-05-01", &[(a, huge), (b, huge)]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::Validation(ValidationError::InvalidPrice { .. }))));
        assert_eq!(count(db.pool(), "venta_tickets").await, 0);
        assert_eq!(count(db.pool(), "ventas").await, 0);
        assert_eq!(item_status(db.pool(), a).await.as_deref(), Some("VENTA"));
    }

    #[tokio::test]
    async fn test_bulk_rejects_zero_price_line() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let a = insert_item(db.pool(), "CPU-1", Some("VENTA"), None).await;
        let b = insert_item(db.pool(), "CPU-2", Some("VENTA"), None).await;

        let err = db
            .checkout()
            .checkout_bulk(&bulk("2024-05-01", &[(a, 10000), (b, 0)]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::Validation(ValidationError::InvalidPrice { .. }))));
        assert_eq!(count(db.pool(), "ventas").await, 0);

        // Single checkout still takes a zero price.
        db.checkout().checkout_single(&single(b, "0"), None).await.unwrap();
        assert_eq!(item_status(db.pool(), b).await.as_deref(), Some("VENDIDO"));
    }

    #[tokio::test]
    async fn test_sold_item_can_be_relisted_and_sold_again() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let a = insert_item(db.pool(), "CPU-1", Some("OBSOLETO"), None).await;

        assert!(db.checkout().checkout_bulk(&bulk("2024-05-01", &[(a, 100)]), None).await.is_err());

        db.inventory()
            .list_for_sale(&ListingScope::Single { row_id: a }, None, None)
            .await
            .unwrap();
        db.checkout().checkout_bulk(&bulk("2024-05-01", &[(a, 100)]), None).await.unwrap();

        assert_eq!(item_status(db.pool(), a).await.as_deref(), Some("VENDIDO"));
    }

    #[tokio::test]
    async fn test_reversing_only_record_deletes_ticket() {
        let db = database().await;
        let item = insert_item(db.pool(), "CPU-42", Some("VENTA"), None).await;
        let receipt = db.checkout().checkout_single(&single(item, "150.50"), None).await.unwrap();
        let record_id = receipt.record_ids[0];

        let reversed = db.checkout().reverse(&[record_id, record_id], Some("ana")).await.unwrap();

        assert_eq!(
            reversed,
            vec![ReversedSale {
                record_id,
                row_id: Some(item),
                sku: Some("CPU-42".into()),
                ticket_id: Some(receipt.ticket_id),
            }]
        );
        assert_eq!(item_status(db.pool(), item).await.as_deref(), Some("VENTA"));
        assert_eq!(count(db.pool(), "ventas").await, 0);
        assert!(db.checkout().get_ticket(receipt.ticket_id).await.unwrap().is_none());
        assert_eq!(actions(db.pool()).await, vec!["VENTA_REGISTRADA", "VENTA_REVERTIDA"]);
    }

    #[tokio::test]
    async fn test_reversing_subset_keeps_ticket() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let a = insert_item(db.pool(), "CPU-1", None, None).await;
        let b = insert_item(db.pool(), "CPU-2", None, None).await;
        let receipt = db
            .checkout()
            .checkout_bulk(&bulk("2024-05-01", &[(a, 100), (b, 200)]), None)
            .await
            .unwrap();

        db.checkout().reverse(&receipt.record_ids[..1], None).await.unwrap();

        assert!(db.checkout().get_ticket(receipt.ticket_id).await.unwrap().is_some());
        assert_eq!(item_status(db.pool(), a).await.as_deref(), Some("VENTA"));
        assert_eq!(item_status(db.pool(), b).await.as_deref(), Some("VENDIDO"));

        db.checkout().reverse(&receipt.record_ids[1..], None).await.unwrap();
        assert!(db.checkout().get_ticket(receipt.ticket_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reverse_with_unknown_id_changes_nothing() {
        let db = database().await;
        let item = insert_item(db.pool(), "CPU-1", None, None).await;
        let receipt = db.checkout().checkout_single(&single(item, "1"), None).await.unwrap();

        let err = db
            .checkout()
            .reverse(&[receipt.record_ids[0], 777], None)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(ref ids)) if ids == &vec![777]));
        assert_eq!(count(db.pool(), "ventas").await, 1);
        assert_eq!(item_status(db.pool(), item).await.as_deref(), Some("VENDIDO"));

        let err = db.checkout().reverse(&[], None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
