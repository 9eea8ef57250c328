use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use stockwise_core::StreamKey;

use super::r#trait::{LedgerStore, LedgerStoreError, StoredEvent, StreamAppend};

#[derive(Debug, Default)]
struct Inner {
    streams: HashMap<StreamKey, Vec<StoredEvent>>,
    log: Vec<StoredEvent>,
}

/// In-memory append-only ledger store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    fn validate_batch(idx: usize, batch: &StreamAppend) -> Result<Option<(StreamKey, String)>, LedgerStoreError> {
        let Some(first) = batch.events.first() else {
            return Ok(None);
        };

        // All events of a batch must target the same stream.
        for (i, e) in batch.events.iter().enumerate() {
            if e.stream != first.stream {
                return Err(LedgerStoreError::InvalidAppend(format!(
                    "batch {idx} contains multiple streams (event {i})"
                )));
            }
            if e.aggregate_type != first.aggregate_type {
                return Err(LedgerStoreError::AggregateTypeMismatch(format!(
                    "batch {idx} contains multiple aggregate_types (event {i})"
                )));
            }
        }

        Ok(Some((first.stream, first.aggregate_type.clone())))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append_atomic(&self, batches: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, LedgerStoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        // 1) Validate every batch before touching any stream.
        let mut seen = HashSet::new();
        for (idx, batch) in batches.iter().enumerate() {
            let Some((stream, aggregate_type)) = Self::validate_batch(idx, batch)? else {
                continue;
            };

            if !seen.insert(stream) {
                return Err(LedgerStoreError::InvalidAppend(format!(
                    "stream {stream} appears in more than one batch"
                )));
            }

            let existing = inner.streams.get(&stream).map(Vec::as_slice).unwrap_or_default();
            let current = Self::current_version(existing);
            if !batch.expected_version.matches(current) {
                return Err(LedgerStoreError::Concurrency(format!(
                    "{stream}: expected {:?}, found {current}",
                    batch.expected_version
                )));
            }

            // Enforce aggregate type stability across the stream.
            if let Some(head) = existing.first() {
                if head.aggregate_type != aggregate_type {
                    return Err(LedgerStoreError::AggregateTypeMismatch(format!(
                        "stream aggregate_type is '{}', attempted append with '{}'",
                        head.aggregate_type, aggregate_type
                    )));
                }
            }
        }

        // 2) Commit (cannot fail from here on).
        let mut committed = Vec::new();
        for batch in batches {
            for e in batch.events {
                let sequence_number = inner
                    .streams
                    .get(&e.stream)
                    .map(|s| Self::current_version(s))
                    .unwrap_or(0)
                    + 1;
                let position = inner.log.len() as u64 + 1;

                let stored = StoredEvent {
                    event_id: e.event_id,
                    stream: e.stream,
                    aggregate_type: e.aggregate_type,
                    sequence_number,
                    position,
                    event_type: e.event_type,
                    event_version: e.event_version,
                    occurred_at: e.occurred_at,
                    payload: e.payload,
                };

                inner.streams.entry(stored.stream).or_default().push(stored.clone());
                inner.log.push(stored.clone());
                committed.push(stored);
            }
        }

        Ok(committed)
    }

    fn load_stream(&self, stream: StreamKey) -> Result<Vec<StoredEvent>, LedgerStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(inner.streams.get(&stream).cloned().unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, LedgerStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(inner.log.clone())
    }

    fn stream_version(&self, stream: StreamKey) -> Result<u64, LedgerStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(inner.streams.get(&stream).map(|s| Self::current_version(s)).unwrap_or(0))
    }
}
