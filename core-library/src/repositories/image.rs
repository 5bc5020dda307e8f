//! Image metadata repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{ImageCode, ImageRecord};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{query, query_as, SqlitePool};
use tracing::{debug, warn};

/// One update-or-insert keyed by `filter_code`.
///
/// `created_at` is only present when the record did not exist at lookup time;
/// it is written on insert and never on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertOperation {
    pub filter_code: String,
    pub code: String,
    pub number: u64,
    pub url: String,
    pub folder: String,
    pub updated_at: i64,
    pub created_at: Option<i64>,
}

impl UpsertOperation {
    /// Operation for a code with no stored record
    pub fn insert(code: ImageCode, url: String, folder: String, now: i64) -> Self {
        Self {
            created_at: Some(now),
            ..Self::update(code, url, folder, now)
        }
    }

    /// Operation for a code whose stored record is out of date
    pub fn update(code: ImageCode, url: String, folder: String, now: i64) -> Self {
        Self {
            filter_code: code.code(),
            code: code.code(),
            number: code.number(),
            url,
            folder,
            updated_at: now,
            created_at: None,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.created_at.is_some()
    }

    /// Check the operation is self-consistent; returns the number as stored.
    fn validate(&self) -> Result<i64> {
        let invalid = |message: String| LibraryError::InvalidInput {
            field: "UpsertOperation".to_string(),
            message,
        };

        let code = ImageCode::parse(&self.code)?;
        if self.filter_code != self.code {
            return Err(invalid(format!(
                "filter code {} does not match code {}",
                self.filter_code, self.code
            )));
        }
        if code.number() != self.number {
            return Err(invalid(format!(
                "number {} does not match code {}",
                self.number, self.code
            )));
        }
        if self.url.is_empty() {
            return Err(invalid(format!("url for {} cannot be empty", self.code)));
        }

        i64::try_from(self.number)
            .map_err(|_| invalid(format!("number {} exceeds storage range", self.number)))
    }
}

/// Aggregate counts returned by a bulk write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkWriteResult {
    pub inserted: u64,
    pub modified: u64,
}

/// Document store interface for image metadata
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find the record stored for a code
    ///
    /// # Returns
    /// - `Ok(Some(record))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if the store cannot be queried
    async fn find_by_code(&self, code: &str) -> Result<Option<ImageRecord>>;

    /// Apply upserts in order, each atomic on its own.
    ///
    /// The batch is not transactional. If an operation fails, the ones before
    /// it stay applied, the rest are skipped and the error is
    /// [`LibraryError::BulkWrite`] carrying the counts applied so far.
    async fn bulk_upsert(&self, operations: &[UpsertOperation]) -> Result<BulkWriteResult>;

    /// Count stored records
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of DocumentStore
pub struct SqliteImageStore {
    pool: SqlitePool,
}

impl SqliteImageStore {
    /// Create a new SqliteImageStore
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply one operation inside its own transaction.
    ///
    /// Returns `true` when a new record was inserted.
    async fn apply(&self, op: &UpsertOperation) -> Result<bool> {
        let number = op.validate()?;
        let mut tx = self.pool.begin().await?;

        let updated = query(
            r#"
            UPDATE images
            SET code = ?, number = ?, url = ?, folder = ?, updated_at = ?
            WHERE code = ?
            "#,
        )
        .bind(&op.code)
        .bind(number)
        .bind(&op.url)
        .bind(&op.folder)
        .bind(op.updated_at)
        .bind(&op.filter_code)
        .execute(&mut *tx)
        .await?;

        let inserted = if updated.rows_affected() == 0 {
            query(
                r#"
                INSERT INTO images (code, number, url, folder, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&op.code)
            .bind(number)
            .bind(&op.url)
            .bind(&op.folder)
            .bind(op.created_at.unwrap_or(op.updated_at))
            .bind(op.updated_at)
            .execute(&mut *tx)
            .await?;
            true
        } else {
            false
        };

        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl DocumentStore for SqliteImageStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<ImageRecord>> {
        let record = query_as::<_, ImageRecord>(
            r#"
            SELECT code, number, url, folder, created_at, updated_at
            FROM images
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn bulk_upsert(&self, operations: &[UpsertOperation]) -> Result<BulkWriteResult> {
        let mut result = BulkWriteResult::default();

        for op in operations {
            match self.apply(op).await {
                Ok(true) => result.inserted += 1,
                Ok(false) => result.modified += 1,
                Err(e) => {
                    warn!(code = %op.code, error = %e, "Upsert failed, aborting bulk write");
                    return Err(LibraryError::BulkWrite {
                        inserted: result.inserted,
                        modified: result.modified,
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(
            operations = operations.len(),
            inserted = result.inserted,
            modified = result.modified,
            "Bulk write completed"
        );
        Ok(result)
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
