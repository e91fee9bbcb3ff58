//! # Application State
//!
//! Shared by every handler through axum's `State` extractor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AppState (Clone)                                │
//! │                                                                         │
//! │  ┌──────────────────────────┐    ┌──────────────────────────────────┐  │
//! │  │  Database                │    │  Arc<ScannerSupervisor>          │  │
//! │  │  SqlitePool + AuditLog   │    │  worker thread + scan mailbox    │  │
//! │  │  (pool is thread-safe)   │    │  (internally synchronised)       │  │
//! │  └──────────────────────────┘    └──────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use inventario_db::Database;
use inventario_scanner::ScannerSupervisor;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub scanner: Arc<ScannerSupervisor>,
}

impl AppState {
    pub fn new(db: Database, scanner: ScannerSupervisor) -> Self {
        AppState {
            db,
            scanner: Arc::new(scanner),
        }
    }
}
