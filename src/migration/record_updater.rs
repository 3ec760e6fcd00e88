//! Writes resolved addresses back to their records.

use async_trait::async_trait;
use sqlx::mysql::MySqlPool;

use crate::error::{StepError, StepResult};

#[async_trait]
pub trait RecordUpdater: Send + Sync + 'static {
    /// Store `address` on the record identified by `record_id`
    async fn update(&self, record_id: i64, address: &str) -> StepResult<()>;
}

const UPDATE_ADDRESS_SQL: &str = "UPDATE users SET profile_image = ? WHERE id = ?";

#[derive(Debug, Clone)]
pub struct MySqlRecordUpdater {
    pool: MySqlPool,
}

impl MySqlRecordUpdater {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordUpdater for MySqlRecordUpdater {
    async fn update(&self, record_id: i64, address: &str) -> StepResult<()> {
        let result = sqlx::query(UPDATE_ADDRESS_SQL)
            .bind(address)
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(|source| StepError::Update { record_id, source })?;

        ensure_row_matched(record_id, result.rows_affected())
    }
}

/// sqlx connects with CLIENT_FOUND_ROWS, so `rows_affected` counts matched rows
/// even when the stored address is unchanged. Zero means the row is gone.
fn ensure_row_matched(record_id: i64, rows_affected: u64) -> StepResult<()> {
    if rows_affected == 0 {
        return Err(StepError::Update {
            record_id,
            source: sqlx::Error::RowNotFound,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_row_is_an_update_failure() {
        let err = ensure_row_matched(42, 0).unwrap_err();
        assert!(matches!(
            err,
            StepError::Update {
                record_id: 42,
                source: sqlx::Error::RowNotFound
            }
        ));
    }

    #[test]
    fn test_matched_row_succeeds() {
        assert!(ensure_row_matched(42, 1).is_ok());
    }
}
