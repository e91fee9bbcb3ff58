//! # Inventario Server
//!
//! Loads the configuration, opens the store, and serves the API until
//! Ctrl+C or SIGTERM.
//!
//! ```text
//! inventario.toml ─┐
//! INVENTARIO_*  ───┴─► ServerConfig ─► Database ─┐
//!                                  └─► Scanner ──┴─► axum::serve (0.0.0.0:5000)
//! ```

use std::sync::Arc;

use inventario_db::Database;
use inventario_scanner::{ScannerSupervisor, SystemSerial};
use inventario_server::{init_tracing, router, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Inventario server...");

    let config = ServerConfig::load(None)?;
    info!(
        db = %config.database.path.display(),
        addr = %config.bind_address(),
        "Configuration loaded"
    );

    let db = Database::new(config.db_config()).await?;
    info!("Database ready");

    let scanner = ScannerSupervisor::new(Arc::new(SystemSerial), config.port_settings());
    let state = AppState::new(db.clone(), scanner);
    let scanner = state.scanner.clone();

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(addr = %config.bind_address(), "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scanner.stop();
    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
