//! # Inventario Server
//!
//! HTTP surface over the inventory store and the barcode scanner.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Browser / forwarder                                                   │
//! │        │  JSON body, X-Usuario header                                   │
//! │        ▼                                                                │
//! │   ┌─────────────┐   ┌──────────────┐   ┌─────────────────────────────┐ │
//! │   │ TraceLayer  │──►│ routes::*    │──►│ inventario-db repositories  │ │
//! │   └─────────────┘   │ (extractors) │   │ (SQLite, one tx per write)  │ │
//! │                     └──────┬───────┘   └─────────────────────────────┘ │
//! │                            │                                            │
//! │                            ▼                                            │
//! │                     ┌──────────────────┐                                │
//! │                     │ ScannerSupervisor│  worker thread + mailbox       │
//! │                     └──────────────────┘                                │
//! │                                                                         │
//! │   Failures ──► ApiError ──► {"ok": false, "code": ..., "msg": ...}      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`]: TOML file plus `INVENTARIO_*` environment overrides
//! - [`error`]: error codes and their HTTP statuses
//! - [`extract`]: acting-user header and JSON body extractors
//! - [`routes`]: one module per area of the API
//! - [`state`]: shared handler state

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

use routes::{catalog, events, inventory, reports, sales, scanner};

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        // Sales
        .route("/salidas/registrar_venta", post(sales::register_sale))
        .route("/salidas/registrar_ventas_bulk", post(sales::register_bulk_sale))
        .route("/ventas/revertir", post(sales::reverse_sales))
        // Sale events
        .route("/venta/evento", get(events::dashboard))
        .route("/venta/evento/hoy", get(events::today))
        .route("/venta/evento/abrir", post(events::open))
        .route("/venta/evento/cerrar", post(events::close))
        .route("/venta/evento/agregar", post(events::stage_item))
        .route("/venta/evento/reporte", get(events::staged_report))
        // Reports
        .route("/venta/ticket/{venta_id}", get(reports::ticket))
        .route("/venta/evento/reporte/tickets", get(reports::event_tickets))
        // Scanner
        .route("/start_scanner", get(scanner::start))
        .route("/stop_scanner", get(scanner::stop))
        .route("/last_scanned", get(scanner::last_scanned))
        .route("/push_scan", post(scanner::push_scan))
        .route("/simulate_scan", post(scanner::simulate_scan))
        // Inventory
        .route("/entradas/next_sku", get(inventory::next_sku))
        .route("/entradas/options", get(inventory::field_options))
        .route("/entradas/skus", get(inventory::items_by_prefix))
        .route("/entradas/register", post(inventory::register))
        .route("/product_by_sku", get(inventory::product_by_sku))
        .route("/productos", get(inventory::search))
        .route("/venta", get(inventory::listed_for_sale))
        .route("/venta/update_status", post(inventory::update_status))
        .route("/venta/update_price", post(inventory::update_price))
        .route("/salidas/mark_out", post(inventory::mark_out))
        .route("/historial", get(inventory::history))
        // Catalog
        .route("/categorias", get(catalog::list))
        .route("/categorias/update", post(catalog::rename))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,inventario=debug,tower_http=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// =============================================================================
// Unit Tests
// =============================================================================
