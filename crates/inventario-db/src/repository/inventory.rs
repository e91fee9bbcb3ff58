//! # Inventory Repository
//!
//! Intake, lookup, listing and disposal of physical items.
//!
//! ## Key Operations
//! - Intake with serial-number uniqueness check and `PREFIX-N` numbering
//! - Listing for sale by item, category or selection
//! - Re-pricing and marking items out (donated / scrapped)
//!
//! ## Category Scope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list_for_sale(Category { row_id: 42 }, $150)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  item 42 has SKU "CPU-12"  →  prefix "CPU"                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE inventory SET estado='VENTA', precio=150 WHERE sku LIKE 'CPU-%' │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  one PONER_VENTA_CATEGORIA entry keyed by "CPU"                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use inventario_core::validation::{category_prefix, format_sku, require_text, validate_prefix};
use inventario_core::{
    ActionCode, CoreError, FieldOptions, InventoryItem, ItemStatus, ListingScope, Money,
    NewInventoryItem, OutAction, ValidationError, MAX_FIELD_OPTIONS, MAX_SEARCH_RESULTS,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::debug;

use super::audit::AuditLog;
use super::ITEM_COLUMNS;
use crate::error::{DbError, DbResult};
use crate::now_timestamp;

/// Which column a free-text search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    /// SKU, brand, model, observation or original id (substring match).
    #[default]
    Any,
    /// Exact serial number.
    Serial,
}

/// Repository for inventory operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.inventory();
/// let sku = repo.next_sku("CPU").await?;          // "CPU-13"
/// let row_id = repo.register(&new_item, Some("ana")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
    audit: AuditLog,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool, audit: AuditLog) -> Self {
        InventoryRepository { pool, audit }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Gets an item by rowid.
    pub async fn get(&self, row_id: i64) -> DbResult<Option<InventoryItem>> {
        let sql = format!("SELECT {} FROM inventory WHERE rowid = ?1", ITEM_COLUMNS);
        let item = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(row_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Gets an item by rowid, failing with `ItemNotFound` when absent.
    pub async fn require(&self, row_id: i64) -> DbResult<InventoryItem> {
        self.get(row_id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(row_id).into())
    }

    /// Gets the first item carrying `sku`.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<InventoryItem>> {
        let sql = format!(
            "SELECT {} FROM inventory WHERE sku = ?1 ORDER BY rowid LIMIT 1",
            ITEM_COLUMNS
        );
        let item = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Counts inventory rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Lists the items of one category, optionally filtered by free text.
    pub async fn list_by_prefix(&self, prefix: &str, filter: Option<&str>) -> DbResult<Vec<InventoryItem>> {
        let prefix = validate_prefix(prefix).map_err(CoreError::from)?;
        let pattern = format!("{}-%", prefix);
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());

        let items = match filter {
            None => {
                let sql = format!(
                    "SELECT {} FROM inventory WHERE sku LIKE ?1 ORDER BY sku LIMIT ?2",
                    ITEM_COLUMNS
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(&pattern)
                    .bind(MAX_SEARCH_RESULTS)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(text) => {
                let sql = format!(
                    r#"
                    SELECT {} FROM inventory
                    WHERE sku LIKE ?1
                      AND (sku LIKE ?2 OR marca LIKE ?2 OR modelo LIKE ?2
                           OR observacion LIKE ?2 OR id_original LIKE ?2)
                    ORDER BY sku
                    LIMIT ?3
                    "#,
                    ITEM_COLUMNS
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(&pattern)
                    .bind(format!("%{}%", text))
                    .bind(MAX_SEARCH_RESULTS)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        debug!(prefix = %prefix, count = items.len(), "Listed category");
        Ok(items)
    }

    /// Searches the whole inventory.
    ///
    /// An empty query returns nothing rather than the full table.
    pub async fn search(&self, query: &str, field: SearchField) -> DbResult<Vec<InventoryItem>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        debug!(query = %query, field = ?field, "Searching inventory");

        let items = match field {
            SearchField::Serial => {
                let sql = format!(
                    "SELECT {} FROM inventory WHERE no_serie = ?1 ORDER BY sku LIMIT ?2",
                    ITEM_COLUMNS
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(query)
                    .bind(MAX_SEARCH_RESULTS)
                    .fetch_all(&self.pool)
                    .await?
            }
            SearchField::Any => {
                let sql = format!(
                    r#"
                    SELECT {} FROM inventory
                    WHERE sku LIKE ?1 OR marca LIKE ?1 OR modelo LIKE ?1
                       OR observacion LIKE ?1 OR id_original LIKE ?1
                    ORDER BY sku
                    LIMIT ?2
                    "#,
                    ITEM_COLUMNS
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(format!("%{}%", query))
                    .bind(MAX_SEARCH_RESULTS)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(items)
    }

    /// Lists every item currently listed for sale, ordered by SKU.
    pub async fn listed_for_sale(&self) -> DbResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {} FROM inventory WHERE estado = ?1 ORDER BY sku LIMIT ?2",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(ItemStatus::Venta.as_str())
            .bind(MAX_SEARCH_RESULTS)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Computes the next free SKU for a category prefix.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // inventory holds CPU-1, CPU-7, CPU-12
    /// assert_eq!(repo.next_sku("cpu").await?, "CPU-13");
    /// ```
    pub async fn next_sku(&self, prefix: &str) -> DbResult<String> {
        let prefix = validate_prefix(prefix).map_err(CoreError::from)?;

        let max: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(CAST(substr(sku, instr(sku, '-') + 1) AS INTEGER))
            FROM inventory
            WHERE sku LIKE ?1
            "#,
        )
        .bind(format!("{}-%", prefix))
        .fetch_one(&self.pool)
        .await?;

        Ok(format_sku(&prefix, max.unwrap_or(0) + 1))
    }

    /// Distinct values already used in a category, for intake forms.
    pub async fn field_options(&self, prefix: &str) -> DbResult<FieldOptions> {
        let prefix = validate_prefix(prefix).map_err(CoreError::from)?;
        let pattern = format!("{}-%", prefix);

        Ok(FieldOptions {
            kinds: self.distinct_values("tipo", &pattern).await?,
            brands: self.distinct_values("marca", &pattern).await?,
            models: self.distinct_values("modelo", &pattern).await?,
            statuses: self.distinct_values("estado", &pattern).await?,
            locations: self.distinct_values("ubicacion", &pattern).await?,
            volts: self.distinct_values("volts", &pattern).await?,
        })
    }

    async fn distinct_values(&self, column: &'static str, pattern: &str) -> DbResult<Vec<String>> {
        let sql = format!(
            r#"
            SELECT DISTINCT CAST({col} AS TEXT)
            FROM inventory
            WHERE sku LIKE ?1 AND {col} IS NOT NULL AND TRIM(CAST({col} AS TEXT)) <> ''
            ORDER BY 1
            LIMIT ?2
            "#,
            col = column
        );
        let values = sqlx::query_scalar::<_, String>(&sql)
            .bind(pattern)
            .bind(MAX_FIELD_OPTIONS)
            .fetch_all(&self.pool)
            .await?;
        Ok(values)
    }

    /// Registers a new item.
    ///
    /// ## Returns
    /// * `Ok(row_id)` - The new item's rowid
    /// * `Err(Domain(DuplicateSerial))` - Serial already registered
    pub async fn register(&self, item: &NewInventoryItem, actor: Option<&str>) -> DbResult<i64> {
        let sku = require_text("sku", Some(&item.sku)).map_err(CoreError::from)?;
        let serial = item.serial_number.as_deref().map(str::trim).filter(|s| !s.is_empty());

        if let Some(serial) = serial {
            let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory WHERE no_serie = ?1")
                .bind(serial)
                .fetch_one(&self.pool)
                .await?;
            if taken > 0 {
                return Err(CoreError::DuplicateSerial(serial.to_string()).into());
            }
        }

        debug!(sku = %sku, "Registering item");

        let registered_at = blank_to_none(&item.registered_at).unwrap_or_else(now_timestamp);
        let price = item.price.map(|p| p.as_stored());

        let row_id = sqlx::query(
            r#"
            INSERT INTO inventory (
                sku, id_original, tipo, marca, modelo, no_serie, volts, precio,
                estado, ubicacion, fecha_registro, origen_hoja, observacion, extras
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&sku)
        .bind(blank_to_none(&item.original_id))
        .bind(blank_to_none(&item.kind))
        .bind(blank_to_none(&item.brand))
        .bind(blank_to_none(&item.model))
        .bind(serial)
        .bind(blank_to_none(&item.volts))
        .bind(price)
        .bind(blank_to_none(&item.status))
        .bind(blank_to_none(&item.location))
        .bind(&registered_at)
        .bind(blank_to_none(&item.source_sheet))
        .bind(blank_to_none(&item.observation))
        .bind(blank_to_none(&item.extras))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.audit
            .record(
                actor,
                ActionCode::Entrada,
                Some(row_id),
                Some(&sku),
                Some(json!({
                    "no_serie": serial,
                    "precio": price,
                    "ubicacion": blank_to_none(&item.location),
                })),
            )
            .await;

        Ok(row_id)
    }

    // =========================================================================
    // Listing and Pricing
    // =========================================================================

    /// Lists items for sale, optionally setting their price.
    ///
    /// ## Returns
    /// Number of items updated. Unknown ids in a selection are skipped.
    pub async fn list_for_sale(
        &self,
        scope: &ListingScope,
        price: Option<Money>,
        actor: Option<&str>,
    ) -> DbResult<u64> {
        let stored = price.map(|p| p.as_stored());

        match scope {
            ListingScope::Single { row_id } => {
                let item = self.require(*row_id).await?;
                let updated = sqlx::query(
                    "UPDATE inventory SET estado = ?1, precio = COALESCE(?2, precio) WHERE rowid = ?3",
                )
                .bind(ItemStatus::Venta.as_str())
                .bind(stored)
                .bind(row_id)
                .execute(&self.pool)
                .await?
                .rows_affected();
                self.audit
                    .record(actor, ActionCode::PonerVenta, Some(*row_id), Some(&item.sku), Some(json!({ "precio": stored })))
                    .await;
                Ok(updated)
            }
            ListingScope::Category { row_id } => {
                let item = self.require(*row_id).await?;
                let prefix = category_prefix(&item.sku).to_string();
                let updated = self.update_category(&prefix, Some(ItemStatus::Venta), stored).await?;
                self.audit
                    .record(actor, ActionCode::PonerVentaCategoria, None, Some(&prefix), Some(json!({ "precio": stored })))
                    .await;
                debug!(prefix = %prefix, updated, "Listed category for sale");
                Ok(updated)
            }
            ListingScope::Selected { row_ids } => {
                let mut tx = self.pool.begin().await?;
                let mut touched = Vec::new();

                for row_id in row_ids {
                    let sku: Option<Option<String>> =
                        sqlx::query_scalar("SELECT CAST(sku AS TEXT) FROM inventory WHERE rowid = ?1")
                            .bind(row_id)
                            .fetch_optional(&mut *tx)
                            .await?;
                    let Some(sku) = sku else { continue };

                    sqlx::query("UPDATE inventory SET estado = ?1, precio = COALESCE(?2, precio) WHERE rowid = ?3")
                        .bind(ItemStatus::Venta.as_str())
                        .bind(stored)
                        .bind(row_id)
                        .execute(&mut *tx)
                        .await?;
                    touched.push((*row_id, sku));
                }

                tx.commit().await?;

                for (row_id, sku) in &touched {
                    self.audit
                        .record(
                            actor,
                            ActionCode::PonerVenta,
                            Some(*row_id),
                            sku.as_deref(),
                            Some(json!({ "precio": stored, "bulk": true })),
                        )
                        .await;
                }
                Ok(touched.len() as u64)
            }
        }
    }

    async fn update_category(&self, prefix: &str, status: Option<ItemStatus>, price: Option<f64>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET estado = COALESCE(?1, estado), precio = COALESCE(?2, precio)
            WHERE sku LIKE ?3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(price)
        .bind(format!("{}-%", prefix))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Changes the price of one item or of its whole category.
    ///
    /// Only `Single` and `Category` scopes are accepted.
    pub async fn update_price(&self, scope: &ListingScope, price: Money, actor: Option<&str>) -> DbResult<u64> {
        let stored = price.as_stored();

        match scope {
            ListingScope::Single { row_id } => {
                let result = sqlx::query("UPDATE inventory SET precio = ?1 WHERE rowid = ?2")
                    .bind(stored)
                    .bind(row_id)
                    .execute(&self.pool)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(CoreError::ItemNotFound(*row_id).into());
                }
                self.audit
                    .record(actor, ActionCode::CambiarPrecio, Some(*row_id), None, Some(json!({ "precio": stored })))
                    .await;
                Ok(result.rows_affected())
            }
            ListingScope::Category { row_id } => {
                let item = self.require(*row_id).await?;
                let prefix = category_prefix(&item.sku).to_string();
                let updated = self.update_category(&prefix, None, Some(stored)).await?;
                self.audit
                    .record(actor, ActionCode::CambiarPrecioCategoria, None, Some(&prefix), Some(json!({ "precio": stored })))
                    .await;
                Ok(updated)
            }
            ListingScope::Selected { .. } => Err(DbError::Domain(
                ValidationError::NotAllowed {
                    field: "scope".to_string(),
                    allowed: vec!["single".into(), "category".into()],
                }
                .into(),
            )),
        }
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Marks an item as donated or scrapped.
    pub async fn mark_out(&self, row_id: i64, action: OutAction, actor: Option<&str>) -> DbResult<()> {
        let item = self.require(row_id).await?;

        sqlx::query("UPDATE inventory SET estado = ?1 WHERE rowid = ?2")
            .bind(action.status().as_str())
            .bind(row_id)
            .execute(&self.pool)
            .await?;

        debug!(row_id, status = %action.status(), "Item marked out");

        self.audit
            .record(actor, action.action_code(), Some(row_id), Some(&item.sku), None)
            .await;
        Ok(())
    }
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    inventario_core::validation::optional_text(value.as_deref())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    fn new_item(sku: &str, serial: Option<&str>) -> NewInventoryItem {
        NewInventoryItem {
            sku: sku.to_string(),
            brand: Some("HP".into()),
            serial_number: serial.map(String::from),
            price: Some(Money::from_cents(15050)),
            location: Some(" ".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let db = database().await;
        let repo = db.inventory();

        let row_id = repo.register(&new_item("CPU-1", Some("SN-1")), Some("ana")).await.unwrap();

        let item = repo.get(row_id).await.unwrap().unwrap();
        assert_eq!(item.sku, "CPU-1");
        assert_eq!(item.price_cents, Some(15050));
        assert_eq!(item.location, None);
        assert!(item.registered_at.is_some());
        assert_eq!(repo.get_by_sku("CPU-1").await.unwrap().unwrap().row_id, row_id);
        assert_eq!(actions(db.pool()).await, vec!["ENTRADA"]);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_serial() {
        let db = database().await;
        let repo = db.inventory();
        repo.register(&new_item("CPU-1", Some("SN-1")), None).await.unwrap();

        let err = repo.register(&new_item("CPU-2", Some("SN-1")), None).await.unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::DuplicateSerial(_))));
        assert_eq!(count(db.pool(), "inventory").await, 1);
    }

    #[tokio::test]
    async fn test_register_requires_sku() {
        let db = database().await;
        let err = db.inventory().register(&new_item("  ", None), None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_next_sku() {
        let db = database().await;
        let repo = db.inventory();
        assert_eq!(repo.next_sku("cpu").await.unwrap(), "CPU-1");

        for sku in ["CPU-1", "CPU-7", "CPU-12", "MON-40"] {
            insert_item(db.pool(), sku, None, None).await;
        }

        assert_eq!(repo.next_sku("CPU").await.unwrap(), "CPU-13");
        assert_eq!(repo.next_sku("MON").await.unwrap(), "MON-41");
        assert!(repo.next_sku("").await.is_err());
    }

    #[tokio::test]
    async fn test_legacy_text_price_reads_as_zero() {
        let db = database().await;
        sqlx::query("INSERT INTO inventory (sku, precio) VALUES ('ANT-1', 'consultar')")
            .execute(db.pool())
            .await
            .unwrap();

        let item = db.inventory().get_by_sku("ANT-1").await.unwrap().unwrap();
        assert_eq!(item.price_cents, Some(0));
    }

    #[tokio::test]
    async fn test_field_options_and_search() {
        let db = database().await;
        let repo = db.inventory();
        insert_item(db.pool(), "CPU-1", None, None).await;
        insert_item(db.pool(), "CPU-2", Some("VENTA"), Some(10.0)).await;
        insert_item(db.pool(), "MON-1", None, None).await;

        let options = repo.field_options("CPU").await.unwrap();
        assert_eq!(options.brands, vec!["Dell"]);
        assert_eq!(options.statuses, vec!["VENTA"]);

        assert_eq!(repo.list_by_prefix("CPU", None).await.unwrap().len(), 2);
        assert_eq!(repo.list_by_prefix("CPU", Some("-2")).await.unwrap().len(), 1);
        assert_eq!(repo.search("optiplex", SearchField::Any).await.unwrap().len(), 3);
        assert!(repo.search("", SearchField::Any).await.unwrap().is_empty());
        assert_eq!(repo.listed_for_sale().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_for_sale_scopes() {
        let db = database().await;
        let repo = db.inventory();
        let a = insert_item(db.pool(), "CPU-1", None, Some(50.0)).await;
        let b = insert_item(db.pool(), "CPU-2", Some("VENDIDO"), None).await;
        let c = insert_item(db.pool(), "MON-1", None, None).await;

        let n = repo.list_for_sale(&ListingScope::Single { row_id: a }, None, None).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(repo.get(a).await.unwrap().unwrap().price_cents, Some(5000));

        let n = repo
            .list_for_sale(&ListingScope::Category { row_id: a }, Some(Money::from_cents(9900)), None)
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(item_status(db.pool(), b).await.as_deref(), Some("VENTA"));
        assert_eq!(item_status(db.pool(), c).await, None);

        let n = repo
            .list_for_sale(&ListingScope::Selected { row_ids: vec![c, 999] }, None, Some("ana"))
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            actions(db.pool()).await,
            vec!["PONER_VENTA", "PONER_VENTA_CATEGORIA", "PONER_VENTA"]
        );
    }

    #[tokio::test]
    async fn test_update_price() {
        let db = database().await;
        let repo = db.inventory();
        let a = insert_item(db.pool(), "TEL-1", None, Some(1.0)).await;
        insert_item(db.pool(), "TEL-2", None, None).await;

        repo.update_price(&ListingScope::Single { row_id: a }, Money::from_cents(2500), None).await.unwrap();
        assert_eq!(repo.get(a).await.unwrap().unwrap().price_cents, Some(2500));

        let n = repo.update_price(&ListingScope::Category { row_id: a }, Money::from_cents(100), None).await.unwrap();
        assert_eq!(n, 2);

        let err = repo.update_price(&ListingScope::Single { row_id: 999 }, Money::zero(), None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemNotFound(999))));

        let err = repo
            .update_price(&ListingScope::Selected { row_ids: vec![a] }, Money::zero(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_mark_out() {
        let db = database().await;
        let repo = db.inventory();
        let a = insert_item(db.pool(), "BX-1", Some("VENTA"), None).await;

        repo.mark_out(a, "basura".parse().unwrap(), Some("ana")).await.unwrap();

        assert_eq!(item_status(db.pool(), a).await.as_deref(), Some("OBSOLETO"));
        assert_eq!(actions(db.pool()).await, vec!["OBSOLETO"]);
        assert!(repo.mark_out(999, OutAction::Donado, None).await.is_err());
    }
}
