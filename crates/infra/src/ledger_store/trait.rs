use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use stockwise_core::{ExpectedVersion, StreamKey};
use std::sync::Arc;

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// Built from a typed domain event with [`UncommittedEvent::from_typed`], which
/// serializes the payload and captures the metadata needed to decode it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub stream: StreamKey,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored ledger event.
///
/// - `sequence_number` is per stream, starting at 1, without gaps.
/// - `position` is global append order across all streams; it breaks ties
///   between events with the same `occurred_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub stream: StreamKey,
    pub aggregate_type: String,

    pub sequence_number: u64,
    pub position: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Convert into a stream-scoped envelope for publication.
    pub fn to_envelope(&self) -> stockwise_events::EventEnvelope<JsonValue> {
        stockwise_events::EventEnvelope::new(
            self.event_id,
            self.stream,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }

    pub fn decode<E: DeserializeOwned>(&self) -> Result<E, LedgerStoreError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            LedgerStoreError::Decode(format!(
                "{} #{} ({}): {e}",
                self.stream, self.sequence_number, self.event_type
            ))
        })
    }
}

/// Ledger store operation error.
///
/// Infrastructure errors (storage, concurrency) as opposed to domain errors.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("failed to decode stored event: {0}")]
    Decode(String),

    #[error("ledger storage unavailable: {0}")]
    Unavailable(String),
}

/// One stream's share of an atomic append.
#[derive(Debug, Clone)]
pub struct StreamAppend {
    pub events: Vec<UncommittedEvent>,
    pub expected_version: ExpectedVersion,
}

/// Append-only ledger store, one stream per `(store, article)`.
///
/// Implementations must:
/// - enforce optimistic concurrency against the current stream version
/// - assign `sequence_number`s starting at `current_version + 1`
/// - persist every batch of an `append_atomic` call, or none of them
pub trait LedgerStore: Send + Sync {
    /// Append events to several streams as one unit.
    fn append_atomic(&self, batches: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, LedgerStoreError>;

    /// Load one stream in sequence order.
    fn load_stream(&self, stream: StreamKey) -> Result<Vec<StoredEvent>, LedgerStoreError>;

    /// Every stored event in global append order.
    fn load_all(&self) -> Result<Vec<StoredEvent>, LedgerStoreError>;

    /// Last sequence number of a stream; 0 when it is empty.
    fn stream_version(&self, stream: StreamKey) -> Result<u64, LedgerStoreError> {
        Ok(self.load_stream(stream)?.last().map(|e| e.sequence_number).unwrap_or(0))
    }

    /// Append events to a single stream.
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, LedgerStoreError> {
        self.append_atomic(vec![StreamAppend {
            events,
            expected_version,
        }])
    }
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append_atomic(&self, batches: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, LedgerStoreError> {
        (**self).append_atomic(batches)
    }

    fn load_stream(&self, stream: StreamKey) -> Result<Vec<StoredEvent>, LedgerStoreError> {
        (**self).load_stream(stream)
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, LedgerStoreError> {
        (**self).load_all()
    }

    fn stream_version(&self, stream: StreamKey) -> Result<u64, LedgerStoreError> {
        (**self).stream_version(stream)
    }

    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, LedgerStoreError> {
        (**self).append(events, expected_version)
    }
}

impl UncommittedEvent {
    /// Wrap a typed domain event for a stream.
    pub fn from_typed<E>(
        stream: StreamKey,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, LedgerStoreError>
    where
        E: stockwise_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| LedgerStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            stream,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
