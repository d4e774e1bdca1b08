use crate::pool::fan_out_blocking;
use async_trait::async_trait;
use parking_lot::Mutex;
use shrink_core::error::{Result, StorageError};
use shrink_core::{ReadStorage, ShortenedUrl, Stat, Storage};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SCHEMA: &str = include_str!("../ddl/postgres/shorturls.sql");

const TX_MODE: &str =
    "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ WRITE, NOT DEFERRABLE";

const COPY_SHORTURLS: &str =
    "COPY shorturls (slug, user_id, original, short, corr_id) FROM STDIN";

/// Postgres implementation of the storage contract.
///
/// Every logical write runs in its own repeatable-read transaction.
/// Dropping an uncommitted [`Transaction`] rolls it back, so any early
/// return through `?` leaves the table untouched.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Creates a storage from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a storage by opening a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `shorturls` table and its indexes if they are missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Checks that the database answers within `timeout`.
    pub async fn ping(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map_err(|_| StorageError::Timeout(format!("ping exceeded {timeout:?}")))?
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query(TX_MODE)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(tx)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn shortened_url_from_row(row: &PgRow) -> Result<ShortenedUrl> {
    Ok(ShortenedUrl {
        slug: row.try_get("slug").map_err(map_sqlx_error)?,
        user_id: row.try_get("user_id").map_err(map_sqlx_error)?,
        raw: row.try_get("original").map_err(map_sqlx_error)?,
        value: row.try_get("short").map_err(map_sqlx_error)?,
        corr_id: row.try_get("corr_id").map_err(map_sqlx_error)?,
        is_deleted: row.try_get("deleted").map_err(map_sqlx_error)?,
    })
}

fn count_from_row(row: &PgRow, column: &str) -> Result<u64> {
    let value: i64 = row.try_get(column).map_err(map_sqlx_error)?;
    u64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("negative {column} count: {value}")))
}

/// Escapes a value for the Postgres COPY text format.
fn copy_escape(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

/// Renders `urls` as COPY text rows in `COPY_SHORTURLS` column order.
fn copy_rows(urls: &[ShortenedUrl]) -> String {
    let mut out = String::new();
    for url in urls {
        for (i, field) in [&url.slug, &url.user_id, &url.raw, &url.value, &url.corr_id]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                out.push('\t');
            }
            copy_escape(field, &mut out);
        }
        out.push('\n');
    }
    out
}

#[async_trait]
impl ReadStorage for PostgresStorage {
    async fn get_by_slug(&self, slug: &str) -> Result<ShortenedUrl> {
        let row = sqlx::query(
            r#"
            SELECT slug, user_id, original, short, corr_id, deleted
            FROM shorturls
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref()
            .map(shortened_url_from_row)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    async fn get_by_url(&self, raw: &str) -> Result<ShortenedUrl> {
        let row = sqlx::query(
            r#"
            SELECT slug, user_id, original, short, corr_id, deleted
            FROM shorturls
            WHERE original = $1
            LIMIT 1
            "#,
        )
        .bind(raw)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref()
            .map(shortened_url_from_row)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    async fn collect_by_user(&self, user_id: &str) -> Result<Vec<ShortenedUrl>> {
        if user_id.is_empty() {
            return Err(StorageError::EmptyUserId);
        }

        let mut tx = self.begin().await?;
        let rows = sqlx::query(
            r#"
            SELECT slug, user_id, original, short, corr_id, deleted
            FROM shorturls
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let urls = rows
            .iter()
            .map(shortened_url_from_row)
            .collect::<Result<Vec<_>>>()?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(urls)
    }

    async fn stat(&self) -> Result<Stat> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(users.cnt), 0)::BIGINT AS urls,
                COUNT(*) AS users
            FROM (
                SELECT COUNT(*) AS cnt
                FROM shorturls
                GROUP BY user_id
            ) AS users
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let stat = Stat {
            urls: count_from_row(&row, "urls")?,
            users: count_from_row(&row, "users")?,
        };
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(stat)
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn save(&self, url: ShortenedUrl) -> Result<()> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO shorturls (slug, user_id, original, short, corr_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&url.slug)
        .bind(&url.user_id)
        .bind(&url.raw)
        .bind(&url.value)
        .bind(&url.corr_id)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                warn!(slug = %url.slug, user_id = %url.user_id, "rejected duplicate shortened url");
                return Err(StorageError::UniqueViolation);
            }
            Err(err) => return Err(map_sqlx_error(err)),
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(slug = %url.slug, user_id = %url.user_id, "saved shortened url");
        Ok(())
    }

    /// Bulk insert through the COPY protocol in a single transaction.
    ///
    /// Unlike [`Storage::save`], a unique violation here surfaces as a plain
    /// [`StorageError::Query`]: COPY aborts on the first conflicting row
    /// and reports which constraint failed, not which pair.
    async fn batch(&self, urls: Vec<ShortenedUrl>) -> Result<()> {
        if urls.is_empty() {
            return Ok(());
        }

        let mut tx = self.begin().await?;
        let rows = copy_rows(&urls);

        let copied = {
            let mut copy = tx
                .copy_in_raw(COPY_SHORTURLS)
                .await
                .map_err(map_sqlx_error)?;
            copy.send(rows.as_bytes()).await.map_err(map_sqlx_error)?;
            copy.finish().await.map_err(map_sqlx_error)?
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(count = copied, "saved shortened url batch");
        Ok(())
    }

    /// Soft-deletes the owned slugs in one round-trip.
    ///
    /// A bounded worker pool assembles the batch of slugs; the update itself
    /// is a single statement in a single transaction.
    async fn delete(&self, user_id: &str, slugs: &[String]) -> Result<()> {
        let batch = Arc::new(Mutex::new(Vec::with_capacity(slugs.len())));
        let queue = Arc::clone(&batch);
        fan_out_blocking(slugs.to_vec(), move |slug: String| {
            if !slug.is_empty() {
                queue.lock().push(slug);
            }
        })
        .await?;
        let batch = std::mem::take(&mut *batch.lock());

        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE shorturls
            SET deleted = true
            WHERE user_id = $1
              AND slug = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(&batch)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            user_id,
            requested = slugs.len(),
            deleted = result.rows_affected(),
            "processed delete request"
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_rows_escapes_special_characters() {
        let urls = vec![
            ShortenedUrl::new("u1", "c1", "http://a.com/x\ty", "s1", "http://l/s1"),
            ShortenedUrl::new("u2", "", "http://b.com/\\n", "s2", "http://l/s2"),
        ];

        assert_eq!(
            copy_rows(&urls),
            "s1\tu1\thttp://a.com/x\\ty\thttp://l/s1\tc1\n\
             s2\tu2\thttp://b.com/\\\\n\thttp://l/s2\t\n"
        );
    }

    #[test]
    fn copy_rows_of_nothing_is_empty() {
        assert!(copy_rows(&[]).is_empty());
    }

    #[test]
    fn pool_errors_are_classified() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
