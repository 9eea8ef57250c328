use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::warn;

use stockwise_core::{ArticleId, StoreId, StreamKey};
use stockwise_events::EventEnvelope;
use stockwise_inventory::{apply_delta, StockEvent};

use crate::read_model::StoreScopedStore;

/// Current on-hand state of one article in one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReadModel {
    pub store_id: StoreId,
    pub article_id: ArticleId,
    pub on_hand: i64,
    /// Cumulative quantity swallowed by the zero floor.
    pub shortfall: i64,
    pub movement_count: u64,
    pub last_movement_at: Option<DateTime<Utc>>,
}

impl StockReadModel {
    fn empty(key: StreamKey) -> Self {
        Self {
            store_id: key.store_id,
            article_id: key.article_id,
            on_hand: 0,
            shortfall: 0,
            movement_count: 0,
            last_movement_at: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize stock event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number on {stream} (last={last}, found={found})")]
    NonMonotonicSequence { stream: StreamKey, last: u64, found: u64 },

    #[error("projection cursor lock poisoned")]
    LockPoisoned,
}

/// Inventory projector: on-hand stock per `(store, article)`.
///
/// Consumes committed envelopes (JSON payloads). Read models are disposable
/// and rebuildable from the ledger.
#[derive(Debug)]
pub struct InventoryProjector<S>
where
    S: StoreScopedStore<ArticleId, StockReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<StreamKey, u64>>,
}

impl<S> InventoryProjector<S>
where
    S: StoreScopedStore<ArticleId, StockReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, store_id: StoreId, article_id: ArticleId) -> Option<StockReadModel> {
        self.store.get(store_id, &article_id)
    }

    /// On-hand quantity; 0 for a key with no movements.
    pub fn on_hand(&self, store_id: StoreId, article_id: ArticleId) -> i64 {
        self.get(store_id, article_id).map(|rm| rm.on_hand).unwrap_or(0)
    }

    /// Every tracked article of a store.
    pub fn list(&self, store_id: StoreId) -> Vec<StockReadModel> {
        let mut rows = self.store.list(store_id);
        rows.sort_by_key(|r| r.article_id);
        rows
    }

    /// Last applied sequence number of a stream (0 if none).
    pub fn cursor(&self, key: StreamKey) -> u64 {
        self.cursors
            .read()
            .ok()
            .and_then(|c| c.get(&key).copied())
            .unwrap_or(0)
    }

    /// Apply a committed envelope.
    ///
    /// - Replays at or below the stream cursor are ignored (at-least-once safe)
    /// - Anything but `cursor + 1` after that is a gap and is rejected
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let key = envelope.stream();
        let seq = envelope.sequence_number();

        let mut cursors = self.cursors.write().map_err(|_| ProjectionError::LockPoisoned)?;

        let last = *cursors.get(&key).unwrap_or(&0);
        if seq <= last && seq != 0 {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }
        if seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence {
                stream: key,
                last,
                found: seq,
            });
        }

        let event: StockEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let movement = event.movement();
        if movement.stream_key() != key {
            return Err(ProjectionError::StreamMismatch(format!(
                "movement {} targets {}, envelope stream is {key}",
                movement.id,
                movement.stream_key()
            )));
        }

        let mut rm = self
            .store
            .get(key.store_id, &key.article_id)
            .unwrap_or_else(|| StockReadModel::empty(key));

        let (on_hand, shortfall) = apply_delta(rm.on_hand, movement.signed_delta());
        if shortfall > 0 {
            warn!(
                stream = %key,
                movement_id = %movement.id,
                movement_type = %movement.movement_type,
                quantity = movement.quantity,
                shortfall,
                "stock clamped at zero"
            );
        }

        rm.on_hand = on_hand;
        rm.shortfall = rm.shortfall.saturating_add(shortfall);
        rm.movement_count += 1;
        rm.last_movement_at = Some(movement.created_at);
        self.store.upsert(key.store_id, key.article_id, rm);

        // Advance cursor after successful apply.
        cursors.insert(key, seq);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        self.cursors
            .write()
            .map_err(|_| ProjectionError::LockPoisoned)?
            .clear();
        self.store.clear_all();

        let mut envs: Vec<_> = envelopes.into_iter().collect();

        // Deterministic replay order: stream, then sequence.
        envs.sort_by_key(|e| (e.stream(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
