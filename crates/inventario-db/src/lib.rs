//! # inventario-db: Database Layer for Inventario
//!
//! All SQL lives here. Repositories share one `SqlitePool` and one
//! [`AuditLog`]; writes that touch more than one row run in a single
//! transaction and audit only after commit.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Inventario Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (registrar_ventas_bulk)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  inventario-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │    schema    │  │   │
//! │  │   │   (pool.rs)   │    │               │    │ (reconcile)  │  │   │
//! │  │   │               │    │ Inventory     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Event         │    │ CREATE IF NOT│  │   │
//! │  │   │ busy_timeout  │    │ Checkout      │    │ ADD COLUMN   │  │   │
//! │  │   │ WAL           │    │ Report, Audit │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file shared with the legacy spreadsheet import                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use inventario_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("inventario.db")).await?;
//! let event = db.events().ensure_today(Some("ana")).await?;
//! let receipt = db.checkout().checkout_bulk(&request, Some("ana")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pool;
pub mod repository;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::audit::AuditLog;
pub use repository::catalog::CatalogRepository;
pub use repository::checkout::{BulkCheckout, CheckoutRepository, SingleCheckout};
pub use repository::event::{CloseOutcome, EventRepository, StagedReport};
pub use repository::inventory::{InventoryRepository, SearchField};
pub use repository::report::ReportRepository;

// =============================================================================
// Clock
// =============================================================================

/// Local timestamp in the format stored in every `*_cuando` / `fecha_*`
/// column.
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Today's local date as an event key.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
