//! # Pool and Repository Handles
//!
//! ```text
//!   inventario.db ──► SqlitePool (WAL, busy_timeout) ──► schema::reconcile
//!                            │
//!          ┌─────────────────┼──────────────────┬──────────────┐
//!          ▼                 ▼                  ▼              ▼
//!     inventory()        events()          checkout()     reports()
//!          │                 │                  │
//!          └──── AuditLog (retries on SQLITE_BUSY) ┘
//! ```
//!
//! Every repository handed out by [`Database`] shares one pool, so request
//! handlers never open connections of their own.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::audit::AuditLog;
use crate::repository::catalog::CatalogRepository;
use crate::repository::checkout::CheckoutRepository;
use crate::repository::event::EventRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::report::ReportRepository;
use crate::schema;

// =============================================================================
// Configuration
// =============================================================================

/// Pool and write-contention settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("/srv/inventario/inventario.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Created on first connect when missing.
    pub database_path: PathBuf,
    /// Sized for a handful of LAN clients plus the scanner page (8).
    pub max_connections: u32,
    pub min_connections: u32,
    /// Pool acquire timeout (30 s).
    pub connect_timeout: Duration,
    /// Idle connections are dropped after 10 min.
    pub idle_timeout: Duration,
    /// SQLite `busy_timeout`; writers wait this long for the lock (4 s).
    pub busy_timeout: Duration,
    /// Movement log attempts when the database is locked (5).
    pub audit_max_retries: u32,
    /// Pause between movement log attempts (120 ms).
    pub audit_retry_delay: Duration,
    /// Run [`schema::reconcile`] from [`Database::new`].
    pub reconcile_schema: bool,
}

impl DbConfig {
    /// Production defaults for the database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 8,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(4),
            audit_max_retries: 5,
            audit_retry_delay: Duration::from_millis(120),
            reconcile_schema: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets the movement log retry policy.
    pub fn audit_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.audit_max_retries = max_retries;
        self.audit_retry_delay = delay;
        self
    }

    /// Skip reconciliation for databases another tool manages.
    pub fn reconcile_schema(mut self, run: bool) -> Self {
        self.reconcile_schema = run;
        self
    }

    /// Private `:memory:` database for tests.
    ///
    /// Each SQLite connection would get its own empty database, so the pool
    /// is pinned to one.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(1),
            audit_retry_delay: Duration::from_millis(10),
            ..DbConfig::new(":memory:")
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle the server keeps in its state.
///
/// Cloning copies the pool handle, not the connections.
///
/// ```text
/// handler ──► state.db.events() ──► EventRepository { pool, audit }
/// ```
///
/// ```rust,ignore
/// async fn today(State(state): State<AppState>) -> Json<TodaySummary> {
///     Json(state.db.events().read_today().await)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Movement log sharing the pool.
    audit: AuditLog,
}

impl Database {
    /// Opens (or creates) the database in WAL mode and reconciles the
    /// legacy tables unless disabled.
    ///
    /// ## Returns
    /// * `Ok(Database)` - Pool connected, schema current
    /// * `Err(DbError::ConnectionFailed)` - File or pool could not be opened
    /// * `Err(DbError::SchemaFailed)` - A reconciliation statement failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening inventory database"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            // Legacy tables carry no foreign keys; ventas.rowid_producto
            // must survive inventory edits.
            .foreign_keys(false)
            .create_if_missing(true);

        debug!(busy_timeout_ms = config.busy_timeout.as_millis() as u64, "SQLite options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Inventory pool connected"
        );

        let audit = AuditLog::new(pool.clone())
            .with_retries(config.audit_max_retries, config.audit_retry_delay);
        let db = Database { pool, audit };

        if config.reconcile_schema {
            db.reconcile_schema().await?;
        }

        Ok(db)
    }

    /// Creates missing tables and columns. Idempotent.
    pub async fn reconcile_schema(&self) -> DbResult<()> {
        info!("Reconciling database schema");
        schema::reconcile(&self.pool).await?;
        Ok(())
    }

    /// Raw pool, for the seed binary and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the movement log.
    pub fn audit(&self) -> AuditLog {
        self.audit.clone()
    }

    /// Returns the inventory repository.
    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone(), self.audit())
    }

    /// Returns the sale-event repository.
    pub fn events(&self) -> EventRepository {
        EventRepository::new(self.pool.clone(), self.audit())
    }

    /// Returns the checkout engine.
    pub fn checkout(&self) -> CheckoutRepository {
        CheckoutRepository::new(self.pool.clone(), self.audit())
    }

    /// Returns the ticket and report queries.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Returns the category name catalog.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        info!("Closing inventory database");
        self.pool.close().await;
    }

    /// `SELECT 1` succeeds. Backs `GET /health`.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_reconciles() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'inventory'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn test_file_created_and_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventario.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();

        assert!(db.health_check().await);
        assert!(path.exists());
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_memory_config_keeps_one_connection() {
        let config = DbConfig::in_memory();

        assert_eq!(config.max_connections, 1);
        assert_eq!(config.audit_max_retries, 5);
        assert!(config.reconcile_schema);
    }

    #[test]
    fn test_builder_overrides_retry_policy() {
        let config = DbConfig::new("inventario-prueba.db")
            .max_connections(3)
            .audit_retries(2, Duration::from_millis(40))
            .reconcile_schema(false);

        assert_eq!(config.max_connections, 3);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_secs(4));
        assert_eq!((config.audit_max_retries, config.audit_retry_delay), (2, Duration::from_millis(40)));
        assert!(!config.reconcile_schema);
    }
}
