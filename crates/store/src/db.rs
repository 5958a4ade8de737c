//! SQLite pool for the project storage.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::sqlite::{
    SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

// One writer per scope, a handful of scopes, plus readers from the watcher.
const MAX_CONNECTIONS: u32 = 4;
// A pass over a large import path holds the write lock for the whole
// synchronization; other scopes wait for it.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Settings SqliteConnectOptions has no builder for. Applied to every pooled
/// connection.
const CONNECTION_PRAGMAS: &[(&str, &str)] = &[
    ("locking_mode", "NORMAL"),
    ("wal_autocheckpoint", "800"),
    ("cache_size", "-8192"),
    ("temp_store", "MEMORY"),
];

enum Target<'a> {
    File(&'a Path),
    /// Every connection to `:memory:` opens its own database, so the pool is
    /// limited to one connection.
    Memory,
}

/// Connection pool with the schema migrated to the latest version.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the project storage at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Target::File(path.as_ref())).await
    }

    /// Open a private in-memory storage. Used by tests of this crate and of
    /// the updater.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(Target::Memory).await
    }

    async fn open(target: Target<'_>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .auto_vacuum(SqliteAutoVacuum::None);
        let (options, max_connections) = match target {
            Target::File(path) => (options.filename(path).create_if_missing(true), MAX_CONNECTIONS),
            Target::Memory => (options.filename(":memory:"), 1),
        };
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, _meta| Box::pin(async move { apply_pragmas(conn).await }))
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    #[instrument("migrating project storage", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Latest applied migration, or `0` for an empty database.
    pub async fn schema_version(&self) -> Result<i64> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        Ok(version.unwrap_or(0))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool once every connection has been returned.
    pub async fn close(&self) {
        // Refresh query planner statistics before letting go.
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

async fn apply_pragmas(conn: &mut SqliteConnection) -> sqlx::Result<()> {
    for (name, value) in CONNECTION_PRAGMAS {
        sqlx::query(&format!("PRAGMA {name} = {value}")).execute(&mut *conn).await?;
    }
    Ok(())
}
