//! SQLite persistence. Each submodule owns the queries for one table;
//! lifecycle rules live in `services`, not here.

pub mod applications;
pub mod messages;
pub mod sessions;
pub mod trips;
pub mod users;

use std::{
    ops::{Deref, DerefMut},
    str::FromStr,
    time::Duration,
};

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::AppError;

pub type DbPool = SqlitePool;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn init_pool(database_url: &str) -> Result<DbPool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &DbPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrations applied");
    Ok(())
}

const FINISHED: &str = "write transaction already finished";

/// Transaction opened with `BEGIN IMMEDIATE`. The write lock is taken before
/// the first read, so concurrent writers queue on the busy timeout instead of
/// failing when a deferred transaction tries to upgrade its lock.
///
/// Dropping it without [`WriteTx::commit`] rolls back.
pub struct WriteTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTx {
    pub async fn begin(pool: &DbPool) -> Result<Self, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub async fn commit(mut self) -> Result<(), sqlx::Error> {
        if let Some(mut conn) = self.conn.take() {
            if let Err(err) = sqlx::query("COMMIT").execute(&mut *conn).await {
                rollback_detached(conn);
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Deref for WriteTx {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_deref().expect(FINISHED)
    }
}

impl DerefMut for WriteTx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_deref_mut().expect(FINISHED)
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            rollback_detached(conn);
        }
    }
}

/// Rolls back off the caller's path; the connection only returns to the pool
/// once the rollback went through, otherwise it is closed.
fn rollback_detached(mut conn: PoolConnection<Sqlite>) {
    tokio::spawn(async move {
        if let Err(err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            warn!(error = %err, "rollback failed, closing connection");
            drop(conn.detach());
        }
    });
}
