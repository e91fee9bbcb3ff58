//! # Repository Module
//!
//! Database repository implementations for Inventario.
//!
//! ## Repository Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database                                                               │
//! │  ├── inventory()  InventoryRepository  intake, listing, mark out       │
//! │  ├── events()     EventRepository      day events, staging             │
//! │  ├── checkout()   CheckoutRepository   single, bulk, reversal          │
//! │  ├── reports()    ReportRepository     ticket bundle, event report     │
//! │  ├── catalog()    CatalogRepository    category names                  │
//! │  └── audit()      AuditLog             movimientos                     │
//! │                                                                         │
//! │  Every repository holds a clone of the same SqlitePool.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod catalog;
pub mod checkout;
pub mod event;
pub mod inventory;
pub mod report;

/// Column list mapping an `inventory` row onto [`inventario_core::InventoryItem`].
///
/// Legacy rows hold prices as REAL or text; non-numeric text reads as 0.
pub(crate) const ITEM_COLUMNS: &str = r#"
    rowid AS row_id,
    COALESCE(CAST(sku AS TEXT), '') AS sku,
    CAST(id_original AS TEXT) AS original_id,
    CAST(tipo AS TEXT) AS kind,
    CAST(marca AS TEXT) AS brand,
    CAST(modelo AS TEXT) AS model,
    CAST(no_serie AS TEXT) AS serial_number,
    CAST(volts AS TEXT) AS volts,
    CAST(ROUND(CAST(precio AS REAL) * 100) AS INTEGER) AS price_cents,
    CAST(estado AS TEXT) AS status,
    CAST(ubicacion AS TEXT) AS location,
    CAST(fecha_registro AS TEXT) AS registered_at,
    CAST(origen_hoja AS TEXT) AS source_sheet,
    CAST(observacion AS TEXT) AS observation,
    CAST(extras AS TEXT) AS extras
"#;

/// Column list mapping a `ventas` row (aliased `v`) onto
/// [`inventario_core::SaleRecord`].
pub(crate) const RECORD_COLUMNS: &str = r#"
    v.id AS id,
    CAST(v.rowid_producto AS INTEGER) AS row_id,
    CAST(v.sku AS TEXT) AS sku,
    CAST(v.tipo AS TEXT) AS kind,
    CAST(v.marca AS TEXT) AS brand,
    CAST(v.modelo AS TEXT) AS model,
    CAST(v.no_serie AS TEXT) AS serial_number,
    CAST(ROUND(CAST(v.precio_venta AS REAL) * 100) AS INTEGER) AS price_cents,
    CAST(v.comprador AS TEXT) AS buyer,
    CAST(v.vendedor AS TEXT) AS seller,
    CAST(v.observaciones AS TEXT) AS notes,
    CAST(v.fecha_venta AS TEXT) AS sold_at,
    CAST(v.evento_fecha AS TEXT) AS event_date,
    CAST(v.ticket_id AS INTEGER) AS ticket_id
"#;

/// `ventas v LEFT JOIN venta_tickets t` columns for
/// [`inventario_core::TicketedRecord`].
pub(crate) const TICKET_JOIN_COLUMNS: &str = r#"
    CAST(t.comprador AS TEXT) AS ticket_buyer,
    CAST(t.vendedor AS TEXT) AS ticket_seller,
    CAST(t.observaciones AS TEXT) AS ticket_notes,
    CAST(t.fecha_venta AS TEXT) AS ticket_sold_at,
    CAST(t.evento_fecha AS TEXT) AS ticket_event_date,
    CAST(ROUND(CAST(t.total AS REAL) * 100) AS INTEGER) AS ticket_total_cents,
    CAST(t.total_items AS INTEGER) AS ticket_items
"#;
