//! Data model of a migration run: records, pages, the watermark and the
//! per-record unit of work.

use serde::{Deserialize, Serialize};

/// One migratable row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub name: Option<String>,
    pub username: Option<String>,
    /// Base64 encoded image bytes
    #[sqlx(rename = "profile_image_base64")]
    pub payload: String,
}

impl Record {
    pub fn new(id: i64, payload: impl Into<String>) -> Self {
        Self {
            id,
            name: None,
            username: None,
            payload: payload.into(),
        }
    }

    /// A record is a migration candidate iff it carries a payload
    pub fn is_eligible(&self) -> bool {
        !self.payload.is_empty()
    }
}

/// Ordered batch of eligible records returned by one page query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    records: Vec<Record>,
}

impl Page {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Highest id in the page, which is the last one for a well-formed page
    pub fn last_id(&self) -> Option<i64> {
        self.records.last().map(|r| r.id)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl IntoIterator for Page {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl From<Vec<Record>> for Page {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

/// Exclusive lower bound of the next page query
///
/// Owned by the driver. It moves to a record's id as soon as that record is
/// dispatched, regardless of how the record's pipeline later ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(i64);

impl Watermark {
    pub fn new(start_after_id: i64) -> Self {
        Self(start_after_id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whether `id` lies strictly above the watermark
    pub fn admits(&self, id: i64) -> bool {
        id > self.0
    }

    /// Move forward to `id`. Lower values leave the watermark untouched.
    pub fn advance(&mut self, id: i64) {
        if id > self.0 {
            self.0 = id;
        }
    }
}

/// Unit of work for one record, owned by a single worker slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTask {
    pub record_id: i64,
    pub payload: String,
    pub storage_key: String,
}

impl PipelineTask {
    pub fn new(record: Record, storage_key: String) -> Self {
        Self {
            record_id: record.id,
            payload: record.payload,
            storage_key,
        }
    }
}

/// Result of a record whose four steps all succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedRecord {
    pub record_id: i64,
    pub local_path: std::path::PathBuf,
    pub storage_key: String,
    pub address: String,
    pub bytes: usize,
}

/// What a completed run reports. Per-record outcomes are only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSummary {
    pub run_id: uuid::Uuid,
    /// Page queries issued, including the final empty one
    pub pages_fetched: u64,
    pub records_dispatched: u64,
    pub final_watermark: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_never_moves_backwards() {
        let mut watermark = Watermark::new(10);
        watermark.advance(15);
        watermark.advance(12);
        assert_eq!(watermark.value(), 15);
        assert!(watermark.admits(16));
        assert!(!watermark.admits(15));
    }

    #[test]
    fn test_page_last_id() {
        let page = Page::new(vec![Record::new(3, "a"), Record::new(8, "b")]);
        assert_eq!(page.len(), 2);
        assert_eq!(page.last_id(), Some(8));
        assert_eq!(Page::empty().last_id(), None);
    }

    #[test]
    fn test_eligibility() {
        assert!(Record::new(1, "aGk=").is_eligible());
        assert!(!Record::new(2, "").is_eligible());
    }

    #[test]
    fn test_pipeline_task_takes_record_identity() {
        let task = PipelineTask::new(Record::new(9, "aGk="), "p/user_9.png".to_string());
        assert_eq!(task.record_id, 9);
        assert_eq!(task.payload, "aGk=");
        assert_eq!(task.storage_key, "p/user_9.png");
    }
}
