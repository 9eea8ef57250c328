use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockwise_core::{ArticleId, StoreId, StreamKey};

/// Envelope for a committed ledger event.
///
/// - Scoped to one `(store, article)` stream.
/// - `sequence_number` increases by one per event within the stream.
/// - `payload` is the domain-agnostic event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    stream: StreamKey,
    aggregate_type: String,

    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        stream: StreamKey,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            stream,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn stream(&self) -> StreamKey {
        self.stream
    }

    pub fn store_id(&self) -> StoreId {
        self.stream.store_id
    }

    pub fn article_id(&self) -> ArticleId {
        self.stream.article_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
