//! Stock ledger service.
//!
//! Every stock mutation goes through this pipeline, under one writer lock:
//!
//! ```text
//! validate + authorize
//!   ↓
//! 1. Stamp the movement time and load each stream's `StockLevel`
//!    (seeded from the projection when it is caught up, replayed otherwise)
//!   ↓
//! 2. Decide (`handle`), applying the negative-stock policy
//!   ↓
//! 3. Append every stream's events in one atomic batch
//!   ↓
//! 4. Project committed envelopes, then publish them
//!   ↓
//! 5. Hand the write to the persistence gateway (outbox on failure) and notify
//! ```
//!
//! Nothing is written when validation, authorization or the decision fails.
//! Steps 1-5 run under the writer lock, so ledger order, timestamp order and
//! gateway order agree.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value as JsonValue;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use stockwise_auth::{PermissionGate, StoreAction};
use stockwise_core::{
    Aggregate, AggregateRoot, ArticleId, Clock, ExpectedVersion, StoreId, StreamKey, SystemClock, UserId,
};
use stockwise_events::{EventBus, EventEnvelope};
use stockwise_inventory::{
    MovementFilter, MovementType, RecordMovement, StockCommand, StockEvent, StockLevel, StockMovement, TransferPlan,
    TransferRequest,
};

use crate::config::InventoryConfig;
use crate::error::{InventoryError, InventoryResult};
use crate::external::PersistenceGateway;
use crate::ledger_store::{LedgerStore, LedgerStoreError, StoredEvent, StreamAppend, UncommittedEvent};
use crate::notifications::{Notification, NotificationSink};
use crate::outbox::{Delivery, FlushReport, Outbox, PendingWrite};
use crate::projections::{InventoryProjector, StockReadModel};
use crate::read_model::StoreScopedStore;

/// Aggregate type recorded on every ledger stream.
pub const STOCK_AGGREGATE_TYPE: &str = "inventory.stock";

/// Append-only stock ledger plus its on-hand projection.
pub struct StockLedger<S, M, B>
where
    M: StoreScopedStore<ArticleId, StockReadModel>,
{
    store: S,
    projector: Arc<InventoryProjector<M>>,
    bus: B,
    gate: Arc<dyn PermissionGate>,
    gateway: Arc<dyn PersistenceGateway>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: InventoryConfig,
    outbox: Outbox,
    writer: Mutex<()>,
}

impl<S, M, B> StockLedger<S, M, B>
where
    S: LedgerStore,
    M: StoreScopedStore<ArticleId, StockReadModel>,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        store: S,
        projector: Arc<InventoryProjector<M>>,
        bus: B,
        gate: Arc<dyn PermissionGate>,
        gateway: Arc<dyn PersistenceGateway>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            projector,
            bus,
            gate,
            gateway,
            notifications,
            clock: Arc::new(SystemClock),
            config: InventoryConfig::default(),
            outbox: Outbox::new(),
            writer: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: InventoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn projector(&self) -> &Arc<InventoryProjector<M>> {
        &self.projector
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub(crate) fn gate(&self) -> &dyn PermissionGate {
        self.gate.as_ref()
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn on_hand(&self, store_id: StoreId, article_id: ArticleId) -> i64 {
        self.projector.on_hand(store_id, article_id)
    }

    /// Record one movement. `actor_id` needs `manage_stock` on the store.
    #[instrument(
        skip_all,
        fields(store_id = %store_id, article_id = %article_id, movement_type = %movement_type, actor_id = %actor_id)
    )]
    pub fn append(
        &self,
        store_id: StoreId,
        article_id: ArticleId,
        movement_type: MovementType,
        quantity: i64,
        actor_id: UserId,
        notes: Option<String>,
    ) -> InventoryResult<StockMovement> {
        let mut movement = StockMovement::new(store_id, article_id, movement_type, quantity, actor_id, self.now())?
            .with_notes(notes);
        self.gate.check(actor_id, store_id, StoreAction::ManageStock)?;

        let writer = self.lock_writer()?;
        movement.created_at = self.now();
        self.commit(&writer, std::slice::from_ref(&movement))?;
        self.persist(PendingWrite::Movement(movement.clone()));
        let on_hand = self.on_hand(store_id, article_id);
        drop(writer);

        info!(movement_id = %movement.id, quantity, on_hand, "stock movement recorded");

        if self.config.notify_on_append {
            self.notifications.add_alert(Notification::success(
                "Stock updated",
                describe_movement(&movement, on_hand),
                movement.created_at,
            ));
        }

        Ok(movement)
    }

    /// Plan and commit both legs of a validated, authorized transfer.
    pub(crate) fn record_transfer(&self, request: &TransferRequest) -> InventoryResult<TransferPlan> {
        let writer = self.lock_writer()?;
        let plan = request.plan(self.now())?;
        self.commit(&writer, &[plan.outbound.clone(), plan.inbound.clone()])?;
        self.persist(PendingWrite::Transfer {
            outbound: plan.outbound.clone(),
            inbound: plan.inbound.clone(),
        });
        drop(writer);

        if self.config.notify_on_append {
            self.notifications.add_alert(Notification::success(
                "Transfer completed",
                format!(
                    "Moved {} units of article {} from store {} to store {} (ref {})",
                    plan.outbound.quantity,
                    plan.outbound.article_id,
                    plan.outbound.store_id,
                    plan.inbound.store_id,
                    plan.reference_id
                ),
                plan.outbound.created_at,
            ));
        }

        Ok(plan)
    }

    /// Movements matching `filter`, oldest first; ties keep append order.
    pub fn get_movements(&self, filter: &MovementFilter) -> InventoryResult<Vec<StockMovement>> {
        let stored = match (filter.store_id, filter.article_id) {
            (Some(store_id), Some(article_id)) => self.store.load_stream(StreamKey::new(store_id, article_id))?,
            _ => self.store.load_all()?,
        };

        let mut movements = Vec::new();
        for e in &stored {
            let event: StockEvent = e.decode()?;
            let movement = event.movement();
            if filter.matches(movement) {
                movements.push((e.position, movement.clone()));
            }
        }

        movements.sort_by_key(|(position, m)| (m.created_at, *position));
        Ok(movements.into_iter().map(|(_, m)| m).collect())
    }

    /// Retry gateway writes held in the outbox.
    #[instrument(skip_all)]
    pub fn flush_outbox(&self) -> FlushReport {
        let report = self.outbox.flush(self.gateway.as_ref());
        if report.delivered > 0 && report.pending == 0 {
            self.notifications.add_alert(Notification::success(
                "Back in sync",
                format!("{} pending change(s) saved to the server", report.delivered),
                self.now(),
            ));
        }
        report
    }

    pub fn pending_writes(&self) -> Vec<PendingWrite> {
        self.outbox.pending()
    }

    /// Drop the projection and replay the whole ledger into it.
    #[instrument(skip_all)]
    pub fn rebuild_projection(&self) -> InventoryResult<()> {
        let _writer = self.lock_writer()?;
        let envelopes: Vec<_> = self.store.load_all()?.iter().map(StoredEvent::to_envelope).collect();
        let count = envelopes.len();
        self.projector.rebuild_from_scratch(envelopes)?;
        info!(events = count, "inventory projection rebuilt");
        Ok(())
    }

    fn lock_writer(&self) -> InventoryResult<MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| InventoryError::Store(LedgerStoreError::Unavailable("writer lock poisoned".to_string())))
    }

    /// Decide, append, project and publish `movements`. Callers hold the writer lock.
    fn commit(&self, _writer: &MutexGuard<'_, ()>, movements: &[StockMovement]) -> InventoryResult<Vec<StoredEvent>> {
        // 1-2) Load and decide per stream.
        let mut batches = Vec::with_capacity(movements.len());
        for movement in movements {
            let key = movement.stream_key();
            let level = self.current_level(key)?;

            let decided = level.handle(&StockCommand::RecordMovement(RecordMovement {
                movement: movement.clone(),
                policy: self.config.negative_stock_policy,
            }))?;

            let events = decided
                .iter()
                .map(|ev| UncommittedEvent::from_typed(key, STOCK_AGGREGATE_TYPE, Uuid::now_v7(), ev))
                .collect::<Result<Vec<_>, _>>()?;

            batches.push(StreamAppend {
                events,
                expected_version: ExpectedVersion::Exact(level.version()),
            });
        }

        // 3) Persist (all streams or none).
        let committed = self.store.append_atomic(batches)?;

        // 4) Project, then publish.
        for stored in &committed {
            let envelope = stored.to_envelope();
            if let Err(err) = self.projector.apply_envelope(&envelope) {
                error!(stream = %stored.stream, sequence = stored.sequence_number, error = %err, "projection failed after append");
                return Err(err.into());
            }
            if let Err(err) = self.bus.publish(envelope) {
                warn!(stream = %stored.stream, error = ?err, "failed to publish ledger envelope");
            }
        }

        Ok(committed)
    }

    /// Decision state of `key`.
    ///
    /// The projection is trusted only when its cursor and movement count both
    /// equal the stream version; anything else replays the stream.
    fn current_level(&self, key: StreamKey) -> InventoryResult<StockLevel> {
        let version = self.store.stream_version(key)?;
        let cursor = self.projector.cursor(key);

        if cursor == version {
            if version == 0 {
                return Ok(StockLevel::empty(key));
            }
            if let Some(rm) = self.projector.get(key.store_id, key.article_id) {
                if rm.movement_count == version {
                    return Ok(StockLevel::restore(key, rm.on_hand, rm.shortfall, version));
                }
            }
        }

        debug!(stream = %key, cursor, version, "projection not caught up; replaying stream");
        rehydrate(key, &self.store.load_stream(key)?)
    }

    fn persist(&self, write: PendingWrite) {
        if let Delivery::Queued { reason } = self.outbox.submit(self.gateway.as_ref(), write) {
            let pending = self.outbox.len();
            warn!(pending, %reason, "working in degraded mode");
            self.notifications.add_alert(Notification::warning(
                "Saved locally",
                format!("The change is recorded here but not yet on the server ({reason}); {pending} change(s) waiting to sync"),
                self.now(),
            ));
        }
    }
}

fn rehydrate(key: StreamKey, history: &[StoredEvent]) -> InventoryResult<StockLevel> {
    let mut level = StockLevel::empty(key);
    let mut last = 0u64;

    for (idx, stored) in history.iter().enumerate() {
        if stored.stream != key {
            return Err(InventoryError::Store(LedgerStoreError::InvalidAppend(format!(
                "loaded stream {key} contains an event of {} at index {idx}",
                stored.stream
            ))));
        }
        if stored.sequence_number != last + 1 {
            return Err(InventoryError::Store(LedgerStoreError::InvalidAppend(format!(
                "non-contiguous sequence_number in {key} (last={last}, found={})",
                stored.sequence_number
            ))));
        }
        last = stored.sequence_number;

        let event: StockEvent = stored.decode()?;
        level.apply(&event);
    }

    Ok(level)
}

fn describe_movement(movement: &StockMovement, on_hand: i64) -> String {
    let verb = match movement.movement_type {
        MovementType::In => "Received",
        MovementType::Out => "Removed",
        MovementType::TransferIn => "Transferred in",
        MovementType::TransferOut => "Transferred out",
    };
    format!(
        "{verb} {} units of article {} at store {} (on hand: {on_hand})",
        movement.quantity, movement.article_id, movement.store_id
    )
}
