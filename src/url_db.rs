use async_trait::async_trait;
use sqlx::{
    migrate::MigrateError,
    postgres::{PgConnectOptions, PgPoolOptions},
    FromRow, PgPool, Postgres, QueryBuilder,
};
use thiserror::Error;
use tracing::debug;

use crate::preferences::Preferences;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("url store is unreachable: {0}")]
    Unavailable(String),
    #[error("url store query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl StoreError {
    /// Splits connectivity problems from everything else the driver can report.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    // Encoded form, see crate::normalize
    url: String,
    approved: bool,
}

impl UrlRecord {
    pub fn new(url: String, approved: bool) -> Self {
        UrlRecord { url, approved }
    }
    pub fn url(&self) -> &str {
        self.url.as_str()
    }
    pub fn approved(&self) -> bool {
        self.approved
    }
}

/// Where url records live. Keys are not unique, so `find_one` hands back the first match in the
/// store's own iteration order.
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    async fn find_one(&self, key: &str) -> Result<Option<UrlRecord>>;

    /// Removes every record and returns how many were removed.
    async fn clear(&self) -> Result<u64>;

    /// Returns the number of inserted records.
    async fn insert_many(&self, records: &[UrlRecord]) -> Result<u64>;

    async fn close(&self) {}
}

/// PostgreSQL backed store. Each operation checks a connection out of the pool and hands it
/// back when it returns.
#[derive(Clone)]
pub struct PgUrlStore {
    pool: PgPool,
}

impl PgUrlStore {
    pub fn new(pool: PgPool) -> Self {
        PgUrlStore { pool }
    }

    /// Builds the pool without connecting, so a database that is down only shows up as failed
    /// lookups rather than a failed start.
    pub fn connect_lazy(prefs: &Preferences) -> Self {
        let options = PgConnectOptions::new()
            .host(prefs.db_ip())
            .port(prefs.db_port())
            .username(prefs.db_user())
            .password(prefs.db_pass())
            .database(prefs.db_name());
        let pool = PgPoolOptions::new()
            .max_connections(prefs.db_pool_size())
            .acquire_timeout(prefs.db_timeout())
            .connect_lazy_with(options);
        PgUrlStore::new(pool)
    }

    pub async fn run_migrations(&self) -> std::result::Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl UrlStore for PgUrlStore {
    async fn find_one(&self, key: &str) -> Result<Option<UrlRecord>> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::from_sqlx)?;
        sqlx::query_as("SELECT url, approved FROM urlinfo WHERE url = $1 ORDER BY id LIMIT 1")
            .bind(key)
            .fetch_optional(&mut *conn)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn clear(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::from_sqlx)?;
        let result = sqlx::query("DELETE FROM urlinfo")
            .execute(&mut *conn)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn insert_many(&self, records: &[UrlRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut transaction = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO urlinfo (url, approved) ");
        builder.push_values(records, |mut row, record| {
            row.push_bind(record.url.clone()).push_bind(record.approved);
        });
        let result = builder
            .build()
            .execute(&mut *transaction)
            .await
            .map_err(StoreError::from_sqlx)?;

        transaction.commit().await.map_err(StoreError::from_sqlx)?;

        debug!("inserted {} url records", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
