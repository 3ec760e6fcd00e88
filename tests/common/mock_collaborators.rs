//! In-memory stand-ins for the migration collaborators.
//!
//! Each one records what it was asked to do and can be told to fail for
//! specific record ids, so tests can inject a fault at any pipeline step.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use image_migrator::error::{SourceError, StepError, StepResult};
use image_migrator::migration::{LocalSink, Page, Record, RecordSource, RecordUpdater, RemoteSink};

use super::builders::valid_record;

/// Serves pages out of a sorted vector of records
#[derive(Debug, Default)]
pub struct InMemoryRecordSource {
    records: Vec<Record>,
    calls: Mutex<Vec<(i64, u32)>>,
    page_lens: Mutex<Vec<usize>>,
    fail_on_call: Option<usize>,
}

impl InMemoryRecordSource {
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by_key(|r| r.id);
        Self {
            records,
            calls: Mutex::new(Vec::new()),
            page_lens: Mutex::new(Vec::new()),
            fail_on_call: None,
        }
    }

    /// Records with the given ids and valid payloads
    pub fn with_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::new(ids.into_iter().map(valid_record).collect())
    }

    /// Make the `n`th `next_page` call (zero-based) fail with a connection error
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// `(after_id, limit)` of every call, in order
    pub fn calls(&self) -> Vec<(i64, u32)> {
        self.calls.lock().clone()
    }

    /// Length of every page served, in order
    pub fn page_lens(&self) -> Vec<usize> {
        self.page_lens.lock().clone()
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn next_page(&self, after_id: i64, limit: u32) -> Result<Page, SourceError> {
        let call_index = {
            let mut calls = self.calls.lock();
            calls.push((after_id, limit));
            calls.len() - 1
        };

        if self.fail_on_call == Some(call_index) {
            return Err(SourceError::Connection(
                "dial tcp 127.0.0.1:3306: connection refused".to_string(),
            ));
        }

        let records = self
            .records
            .iter()
            .filter(|r| r.id > after_id && r.is_eligible())
            .take(limit as usize)
            .cloned()
            .collect::<Vec<_>>();

        self.page_lens.lock().push(records.len());
        Ok(Page::new(records))
    }
}

/// Keeps written images in memory
#[derive(Debug, Default)]
pub struct RecordingLocalSink {
    written: Mutex<HashMap<i64, Vec<u8>>>,
    fail_ids: HashSet<i64>,
}

impl RecordingLocalSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            fail_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn written_ids(&self) -> HashSet<i64> {
        self.written.lock().keys().copied().collect()
    }

    pub fn contents(&self, id: i64) -> Option<Vec<u8>> {
        self.written.lock().get(&id).cloned()
    }
}

#[async_trait]
impl LocalSink for RecordingLocalSink {
    async fn write(&self, record_id: i64, bytes: &[u8]) -> StepResult<PathBuf> {
        let path = PathBuf::from(format!("images/user_{record_id}.png"));
        if self.fail_ids.contains(&record_id) {
            return Err(StepError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
            });
        }
        self.written.lock().insert(record_id, bytes.to_vec());
        Ok(path)
    }
}

/// Keeps uploaded objects in memory and measures overlapping uploads
#[derive(Debug, Default)]
pub struct RecordingRemoteSink {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_keys: HashSet<String>,
    delay: Duration,
    hang: bool,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingRemoteSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            fail_keys: ids.into_iter().map(key_for).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every upload stays pending forever
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> HashSet<String> {
        self.objects.lock().keys().cloned().collect()
    }

    /// Highest number of uploads observed in progress at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSink for RecordingRemoteSink {
    async fn put(&self, key: &str, bytes: Bytes) -> StepResult<String> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if self.hang {
            std::future::pending::<()>().await;
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = if self.fail_keys.contains(key) {
            Err(StepError::Upload {
                key: key.to_string(),
                source: object_store::Error::Generic {
                    store: "recording",
                    source: "403 Forbidden: invalid access key".into(),
                },
            })
        } else {
            self.objects.lock().insert(key.to_string(), bytes);
            Ok(address_for(key))
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Records every address written back
#[derive(Debug, Default)]
pub struct RecordingUpdater {
    updates: Mutex<Vec<(i64, String)>>,
    fail_ids: HashSet<i64>,
}

impl RecordingUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            fail_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn updates(&self) -> Vec<(i64, String)> {
        self.updates.lock().clone()
    }

    pub fn updated_ids(&self) -> HashSet<i64> {
        self.updates.lock().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl RecordUpdater for RecordingUpdater {
    async fn update(&self, record_id: i64, address: &str) -> StepResult<()> {
        if self.fail_ids.contains(&record_id) {
            return Err(StepError::Update {
                record_id,
                source: sqlx::Error::PoolTimedOut,
            });
        }
        self.updates.lock().push((record_id, address.to_string()));
        Ok(())
    }
}

pub fn key_for(id: i64) -> String {
    format!("mybl-tests/user_{id}.png")
}

pub fn address_for(key: &str) -> String {
    format!("https://storage.test/avatars/{key}")
}
