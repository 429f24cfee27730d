//! Helps to connect to the database.
//!
//! Every write in the crate goes through [`Database::begin_write`], which
//! hands out a transaction behind the process-wide write gate. Dropping a
//! [`WriteTx`] without committing rolls everything back.

use std::{sync::Arc, time::Duration};

use camino::Utf8Path;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqliteConnection, SqlitePool, Transaction,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::DatabaseError;

pub const DATABASE_FILE_NAME: &str = "nekobooru.sqlite";

const MAX_CONNECTIONS: u32 = 8;

/// A type that knows how to write itself into its table.
pub trait InsertIntoTable {
    fn make_insertion_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>>;
}

/// A handle to the gallery database.
///
/// Cloning is cheap, and all clones share one pool and one write gate.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl Database {
    /// Opens (or creates) the database inside `data_dir`, then runs any
    /// pending migrations.
    #[tracing::instrument]
    pub async fn open(data_dir: &Utf8Path) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::new()
            .filename(data_dir.join(DATABASE_FILE_NAME))
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .inspect_err(|e| tracing::error!("Failed to connect to the gallery database. err: {e}"))
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    "Database connection succeeded, but migrating the database failed! err: {e}"
                )
            })?;

        tracing::debug!("Database at `{data_dir}` is ready.");
        Ok(Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    /// The pool, for read-only work.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for the write gate, then starts a transaction.
    ///
    /// Only one `WriteTx` exists at a time per `Database`, so read-then-write
    /// sequences (like creating a tag and bumping its usage count) can't
    /// interleave with another writer.
    pub async fn begin_write(&self) -> Result<WriteTx, DatabaseError> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let tx = self
            .pool
            .begin()
            .await
            .inspect_err(|e| tracing::error!("Failed to start a write transaction. err: {e}"))?;

        Ok(WriteTx { tx, _gate: gate })
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await
    }
}

/// A transaction holding the write gate.
pub struct WriteTx {
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

impl WriteTx {
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), DatabaseError> {
        self.tx
            .commit()
            .await
            .inspect_err(|e| tracing::error!("Failed to commit a write transaction. err: {e}"))
            .map_err(DatabaseError::from)
    }
}
