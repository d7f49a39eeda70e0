pub mod dashboard;
pub mod goals;
pub mod ledger;
pub mod models;
pub mod rewards;
pub mod routines;
pub mod schema;
pub mod tasks;

use std::str::FromStr;

use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use models::{Child, NewChild};

use chorepoints_shared::domain::ParseEnumError;

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input, or a status column held text
    /// outside its closed enum.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<ParseEnumError> for StorageError {
    fn from(e: ParseEnumError) -> Self {
        StorageError::InvalidInput(e.to_string())
    }
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        {
            let pool_clone = pool.clone();
            tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
                const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
                let mut conn = pool_clone.get()?;
                configure_sqlite_conn(&mut conn)?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await??;
        }

        Ok(Store { pool })
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`. All Store
    /// methods funnel through here; `f` owns its transaction boundaries.
    pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            f(&mut conn)
        })
        .await?
    }

    pub async fn seed_children(
        &self,
        cfg_children: &[chorepoints_shared::domain::Child],
    ) -> Result<(), StorageError> {
        use schema::children;
        let children_owned = cfg_children.to_owned();
        self.with_conn(move |conn| {
            for c in &children_owned {
                let new_child = NewChild {
                    id: &c.id,
                    display_name: &c.display_name,
                };
                diesel::insert_into(children::table)
                    .values(&new_child)
                    .on_conflict(children::id)
                    .do_update()
                    .set(children::display_name.eq(new_child.display_name))
                    .execute(conn)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn list_children(&self) -> Result<Vec<Child>, StorageError> {
        use schema::children::dsl::*;
        self.with_conn(|conn| {
            Ok(children
                .order(display_name.asc())
                .load::<Child>(conn)?)
        })
        .await
    }

    pub async fn child_exists(&self, child: &str) -> Result<bool, StorageError> {
        use schema::children::dsl::*;
        let child_id = child.to_string();
        self.with_conn(move |conn| {
            let count: i64 = children.filter(id.eq(&child_id)).count().get_result(conn)?;
            Ok(count > 0)
        })
        .await
    }
}

/// Parse a status/role text column into its closed enum.
pub(crate) fn parse_enum<T>(text: &str) -> Result<T, StorageError>
where
    T: FromStr<Err = ParseEnumError>,
{
    Ok(text.parse::<T>()?)
}

pub(crate) fn now_utc() -> chrono::NaiveDateTime {
    Utc::now().naive_utc()
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Enable WAL for better read/write concurrency and set a busy timeout
    // Ignore the result rows; Diesel's execute is fine for PRAGMAs
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    Ok(())
}
