//! # Schema Reconciliation
//!
//! The inventory file predates this service: `inventory` was imported from
//! spreadsheets and older builds created `ventas` without tickets. Instead of
//! versioned migrations the schema is reconciled once at startup.
//!
//! ## How Reconciliation Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Reconciliation Process                              │
//! │                                                                         │
//! │  Database::new()                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. CREATE TABLE IF NOT EXISTS  (every table, full column set)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. PRAGMA table_info(t)  → compare with expected columns              │
//! │       │                                                                 │
//! │       ├── ventas has no ticket_id?  ALTER TABLE ADD COLUMN             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. CREATE INDEX IF NOT EXISTS  (after columns exist)                  │
//! │                                                                         │
//! │  Idempotent: running it twice changes nothing.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        sku TEXT,
        id_original TEXT,
        tipo TEXT,
        marca TEXT,
        modelo TEXT,
        no_serie TEXT,
        volts TEXT,
        precio REAL,
        estado TEXT,
        ubicacion TEXT,
        fecha_registro TEXT,
        origen_hoja TEXT,
        observacion TEXT,
        extras TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS usuarios (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        usuario TEXT UNIQUE,
        password TEXT,
        nivel TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movimientos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        usuario TEXT,
        accion TEXT NOT NULL,
        rowid_producto INTEGER,
        sku TEXT,
        detalles TEXT,
        cuando TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS venta_tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        comprador TEXT,
        vendedor TEXT,
        observaciones TEXT,
        fecha_venta TEXT,
        evento_fecha TEXT,
        total REAL,
        total_items INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ventas (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rowid_producto INTEGER,
        sku TEXT,
        tipo TEXT,
        marca TEXT,
        modelo TEXT,
        no_serie TEXT,
        precio_venta REAL,
        comprador TEXT,
        vendedor TEXT,
        observaciones TEXT,
        fecha_venta TEXT,
        evento_fecha TEXT,
        ticket_id INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS venta_eventos (
        fecha TEXT PRIMARY KEY,
        estado TEXT NOT NULL DEFAULT 'OPEN',
        creado_cuando TEXT,
        cerrado_cuando TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS venta_evento_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        evento_fecha TEXT NOT NULL,
        rowid_producto INTEGER NOT NULL,
        precio_asignado REAL,
        agregado_por TEXT,
        agregado_cuando TEXT,
        UNIQUE (evento_fecha, rowid_producto)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categorias_prefijos (
        prefijo TEXT PRIMARY KEY,
        nombre TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ubicaciones_catalogo (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nombre TEXT NOT NULL,
        nivel TEXT NOT NULL,
        nota TEXT,
        UNIQUE (nivel, nombre)
    )
    "#,
];

/// Columns added to tables created by older builds.
const EXPECTED_COLUMNS: &[(&str, &[(&str, &str)])] = &[
    (
        "inventory",
        &[
            ("sku", "TEXT"),
            ("id_original", "TEXT"),
            ("tipo", "TEXT"),
            ("marca", "TEXT"),
            ("modelo", "TEXT"),
            ("no_serie", "TEXT"),
            ("volts", "TEXT"),
            ("precio", "REAL"),
            ("estado", "TEXT"),
            ("ubicacion", "TEXT"),
            ("fecha_registro", "TEXT"),
            ("origen_hoja", "TEXT"),
            ("observacion", "TEXT"),
            ("extras", "TEXT"),
        ],
    ),
    (
        "ventas",
        &[
            ("rowid_producto", "INTEGER"),
            ("sku", "TEXT"),
            ("tipo", "TEXT"),
            ("marca", "TEXT"),
            ("modelo", "TEXT"),
            ("no_serie", "TEXT"),
            ("precio_venta", "REAL"),
            ("comprador", "TEXT"),
            ("vendedor", "TEXT"),
            ("observaciones", "TEXT"),
            ("fecha_venta", "TEXT"),
            ("evento_fecha", "TEXT"),
            ("ticket_id", "INTEGER"),
        ],
    ),
    (
        "venta_tickets",
        &[
            ("comprador", "TEXT"),
            ("vendedor", "TEXT"),
            ("observaciones", "TEXT"),
            ("fecha_venta", "TEXT"),
            ("evento_fecha", "TEXT"),
            ("total", "REAL"),
            ("total_items", "INTEGER"),
        ],
    ),
    (
        "movimientos",
        &[
            ("usuario", "TEXT"),
            ("rowid_producto", "INTEGER"),
            ("sku", "TEXT"),
            ("detalles", "TEXT"),
            ("cuando", "TEXT"),
        ],
    ),
];

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_ventas_ticket ON ventas(ticket_id)",
    "CREATE INDEX IF NOT EXISTS idx_ventas_evento ON ventas(evento_fecha)",
    "CREATE INDEX IF NOT EXISTS idx_inventory_sku ON inventory(sku)",
    "CREATE INDEX IF NOT EXISTS idx_inventory_no_serie ON inventory(no_serie)",
];

/// Brings the database up to the current schema.
///
/// ## Returns
/// The number of columns added to pre-existing tables.
pub async fn reconcile(pool: &SqlitePool) -> DbResult<usize> {
    for ddl in CREATE_TABLES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;
    }

    let mut added = 0;
    for (table, columns) in EXPECTED_COLUMNS {
        added += add_missing_columns(pool, table, columns).await?;
    }

    for ddl in CREATE_INDEXES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;
    }

    info!(columns_added = added, "Schema reconciled");
    Ok(added)
}

/// Lists the column names of `table`.
pub async fn table_columns(pool: &SqlitePool, table: &str) -> DbResult<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(DbError::from))
        .collect()
}

async fn add_missing_columns(
    pool: &SqlitePool,
    table: &str,
    columns: &[(&str, &str)],
) -> DbResult<usize> {
    let existing = table_columns(pool, table).await?;
    let mut added = 0;

    for (name, sql_type) in columns {
        if existing.iter().any(|c| c.eq_ignore_ascii_case(name)) {
            continue;
        }
        debug!(table = table, column = name, "Adding missing column");
        sqlx::query(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, name, sql_type))
            .execute(pool)
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;
        added += 1;
    }

    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let added = reconcile(db.pool()).await.unwrap();
        assert_eq!(added, 0);

        let columns = table_columns(db.pool(), "ventas").await.unwrap();
        assert!(columns.contains(&"ticket_id".to_string()));
    }

    #[tokio::test]
    async fn test_legacy_ventas_gains_ticket_column() {
        let db = Database::new(DbConfig::in_memory().reconcile_schema(false))
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE ventas (id INTEGER PRIMARY KEY AUTOINCREMENT, rowid_producto INTEGER, \
             sku TEXT, precio_venta REAL, comprador TEXT, fecha_venta TEXT)",
        )
        .execute(db.pool())
        .await
        .unwrap();
        sqlx::query("INSERT INTO ventas (rowid_producto, sku, precio_venta) VALUES (1, 'CPU-1', 10.0)")
            .execute(db.pool())
            .await
            .unwrap();

        let added = reconcile(db.pool()).await.unwrap();

        // tipo, marca, modelo, no_serie, vendedor, observaciones, evento_fecha, ticket_id
        assert_eq!(added, 8);
        let ticket: Option<i64> = sqlx::query_scalar("SELECT ticket_id FROM ventas WHERE sku = 'CPU-1'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(ticket, None);
    }
}
