//! # Report Repository
//!
//! Read-only queries behind receipts and the day report. Grouping and totals
//! live in [`inventario_core::report`]; this module only fetches rows in the
//! order those builders expect.

use inventario_core::report::{build_event_report, build_ticket_bundle};
use inventario_core::{EventReport, SaleEvent, SaleRecord, TicketBundle, TicketedRecord};
use sqlx::SqlitePool;
use tracing::debug;

use super::{RECORD_COLUMNS, TICKET_JOIN_COLUMNS};
use crate::error::DbResult;

/// Repository for sale reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the receipt that contains sale record `record_id`.
    ///
    /// Returns `None` when the record does not exist.
    pub async fn ticket_bundle(&self, record_id: i64) -> DbResult<Option<TicketBundle>> {
        let sql = format!(
            r#"
            SELECT {}, {}
            FROM ventas v
            LEFT JOIN venta_tickets t ON t.id = v.ticket_id
            WHERE v.id = ?1
            "#,
            RECORD_COLUMNS, TICKET_JOIN_COLUMNS
        );
        let Some(anchor) = sqlx::query_as::<_, TicketedRecord>(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = match anchor.record.ticket_id {
            Some(ticket_id) => {
                let sql = format!(
                    "SELECT {} FROM ventas v WHERE v.ticket_id = ?1 ORDER BY v.id",
                    RECORD_COLUMNS
                );
                sqlx::query_as::<_, SaleRecord>(&sql)
                    .bind(ticket_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(Some(build_ticket_bundle(&anchor, items)))
    }

    /// Groups the sales of `date` into tickets with totals.
    ///
    /// A date without an event reports the `SIN EVENTO` state.
    pub async fn event_report(&self, date: &str) -> DbResult<EventReport> {
        let event = sqlx::query_as::<_, SaleEvent>(
            r#"
            SELECT
                CAST(fecha AS TEXT) AS date,
                estado AS state,
                CAST(creado_cuando AS TEXT) AS created_at,
                CAST(cerrado_cuando AS TEXT) AS closed_at
            FROM venta_eventos
            WHERE fecha = ?1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {}, {}
            FROM ventas v
            LEFT JOIN venta_tickets t ON t.id = v.ticket_id
            WHERE v.evento_fecha = ?1
            ORDER BY COALESCE(v.ticket_id, v.id), v.id
            "#,
            RECORD_COLUMNS, TICKET_JOIN_COLUMNS
        );
        let rows = sqlx::query_as::<_, TicketedRecord>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        debug!(date = %date, records = rows.len(), "Building event report");
        Ok(build_event_report(date, event.as_ref(), rows))
    }

    /// Sales recorded under `date`, newest first.
    pub async fn day_sales(&self, date: &str) -> DbResult<Vec<SaleRecord>> {
        let sql = format!(
            "SELECT {} FROM ventas v WHERE v.evento_fecha = ?1 ORDER BY v.fecha_venta DESC, v.id DESC",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, SaleRecord>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;
    use crate::BulkCheckout;
    use inventario_core::{CheckoutLine, Money, NO_EVENT_STATE};

    async fn legacy_sale(pool: &SqlitePool, sku: &str, price: &str, date: &str) -> i64 {
        sqlx::query("INSERT INTO ventas (sku, precio_venta, comprador, evento_fecha) VALUES (?1, ?2, 'Legado', ?3)")
            .bind(sku)
            .bind(price)
            .bind(date)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_bundle_for_ticketed_record() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let a = insert_item(db.pool(), "CPU-1", None, None).await;
        let b = insert_item(db.pool(), "CPU-2", None, None).await;
        let receipt = db
            .checkout()
            .checkout_bulk(
                &BulkCheckout {
                    event_date: "2024-05-01".into(),
                    buyer: "Ana".into(),
                    notes: None,
                    lines: vec![
                        CheckoutLine { row_id: a, price: Money::from_cents(10000) },
                        CheckoutLine { row_id: b, price: Money::from_cents(2500) },
                    ],
                },
                Some("luis"),
            )
            .await
            .unwrap();

        let bundle = db.reports().ticket_bundle(receipt.record_ids[1]).await.unwrap().unwrap();

        assert_eq!(bundle.ticket.id, receipt.ticket_id);
        assert_eq!(bundle.ticket.code, format!("T-{}", receipt.ticket_id));
        assert_eq!(bundle.ticket.anchor_record_id, receipt.record_ids[1]);
        assert_eq!(bundle.ticket.total_cents, 12500);
        assert_eq!(bundle.ticket.total_items, 2);
        assert_eq!(bundle.ticket.seller.as_deref(), Some("luis"));
        let ids: Vec<i64> = bundle.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, receipt.record_ids);
    }

    #[tokio::test]
    async fn test_bundle_for_legacy_record_is_singleton() {
        let db = database().await;
        let id = legacy_sale(db.pool(), "MON-3", "80", "2024-05-01").await;

        let bundle = db.reports().ticket_bundle(id).await.unwrap().unwrap();

        assert_eq!(bundle.ticket.id, id);
        assert_eq!(bundle.ticket.total_cents, 8000);
        assert_eq!(bundle.ticket.total_items, 1);
        assert_eq!(bundle.ticket.buyer.as_deref(), Some("Legado"));
        assert!(db.reports().ticket_bundle(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_report_mixes_ticketed_and_legacy_sales() {
        let db = database().await;
        insert_event(db.pool(), "2024-05-01", "OPEN").await;
        let item = insert_item(db.pool(), "CPU-1", None, None).await;
        db.checkout()
            .checkout_bulk(
                &BulkCheckout {
                    event_date: "2024-05-01".into(),
                    buyer: "Ana".into(),
                    notes: None,
                    lines: vec![CheckoutLine { row_id: item, price: Money::from_cents(5000) }],
                },
                None,
            )
            .await
            .unwrap();
        legacy_sale(db.pool(), "OLD-1", "no-numerico", "2024-05-01").await;

        let report = db.reports().event_report("2024-05-01").await.unwrap();

        assert_eq!(report.event.state, "OPEN");
        assert_eq!(report.total_tickets, 2);
        assert_eq!(report.total_items, 2);
        assert_eq!(report.total_sold_cents, 5000);
        assert_eq!(report.tickets[0].total_cents, 5000);
        assert_eq!(report.tickets[1].total_cents, 0);
    }

    #[tokio::test]
    async fn test_report_without_event_or_sales() {
        let db = database().await;

        let report = db.reports().event_report("2024-05-01").await.unwrap();

        assert_eq!(report, EventReport::empty("2024-05-01"));
        assert_eq!(report.event.state, NO_EVENT_STATE);
    }

    #[tokio::test]
    async fn test_day_sales_newest_first() {
        let db = database().await;
        sqlx::query("INSERT INTO ventas (sku, fecha_venta, evento_fecha) VALUES ('A', '2024-05-01T09:00:00', '2024-05-01'), ('B', '2024-05-01T11:00:00', '2024-05-01'), ('C', '2024-04-30T11:00:00', '2024-04-30')")
            .execute(db.pool())
            .await
            .unwrap();

        let sales = db.reports().day_sales("2024-05-01").await.unwrap();

        let skus: Vec<_> = sales.iter().filter_map(|s| s.sku.as_deref()).collect();
        assert_eq!(skus, vec!["B", "A"]);
    }
}
