//! Paginated read access to migratable records.

use async_trait::async_trait;
use sqlx::mysql::MySqlPool;

use super::types::{Page, Record};
use crate::error::SourceError;

/// Yields ordered pages of eligible records above a watermark
///
/// Implementations return at most `limit` records, ascending by id, each
/// with `id > after_id` and a non-empty payload. An empty page means the
/// record set is exhausted.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    async fn next_page(&self, after_id: i64, limit: u32) -> Result<Page, SourceError>;
}

// `id` is commonly BIGINT UNSIGNED, which sqlx will not decode into i64.
const SELECT_PAGE_SQL: &str = "SELECT CAST(id AS SIGNED) AS id, name, username, profile_image_base64 \
     FROM users \
     WHERE profile_image_base64 != '' AND id > ? \
     ORDER BY id ASC \
     LIMIT ?";

/// Pages through the `users` table
#[derive(Debug, Clone)]
pub struct MySqlRecordSource {
    pool: MySqlPool,
}

impl MySqlRecordSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource for MySqlRecordSource {
    async fn next_page(&self, after_id: i64, limit: u32) -> Result<Page, SourceError> {
        let records = sqlx::query_as::<_, Record>(SELECT_PAGE_SQL)
            .bind(after_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(records))
    }
}
