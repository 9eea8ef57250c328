use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{Aggregate, AggregateRoot, DomainError, StreamKey};
use stockwise_events::Event;

use crate::StockMovement;

/// What to do when an outbound movement exceeds on-hand stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeStockPolicy {
    /// Accept the movement and floor on-hand at zero; the excess is tracked as shortfall.
    #[default]
    Clamp,
    /// Refuse the movement with an invariant violation.
    Reject,
}

impl core::str::FromStr for NegativeStockPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(DomainError::validation(format!(
                "unknown negative stock policy '{other}' (expected clamp|reject)"
            ))),
        }
    }
}

/// Apply a signed delta to an on-hand value, flooring at zero.
///
/// Returns `(new_on_hand, shortfall)` where `shortfall` is the quantity the
/// floor swallowed (0 when the delta fit).
pub fn apply_delta(on_hand: i64, delta: i64) -> (i64, i64) {
    let raw = on_hand.saturating_add(delta);
    if raw < 0 { (0, -raw) } else { (raw, 0) }
}

/// Aggregate root: on-hand stock of one article in one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    key: StreamKey,
    on_hand: i64,
    shortfall: i64,
    version: u64,
}

impl StockLevel {
    /// Empty stream state for rehydration.
    pub fn empty(key: StreamKey) -> Self {
        Self {
            key,
            on_hand: 0,
            shortfall: 0,
            version: 0,
        }
    }

    /// Resume from a known snapshot of the stream, e.g. a caught-up projection.
    pub fn restore(key: StreamKey, on_hand: i64, shortfall: i64, version: u64) -> Self {
        Self {
            key,
            on_hand,
            shortfall,
            version,
        }
    }

    /// Rebuild from a stream's committed events.
    pub fn replay<'a>(key: StreamKey, events: impl IntoIterator<Item = &'a StockEvent>) -> Self {
        let mut level = Self::empty(key);
        for event in events {
            level.apply(event);
        }
        level
    }

    pub fn key(&self) -> StreamKey {
        self.key
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    /// Cumulative quantity lost to the zero floor.
    pub fn shortfall(&self) -> i64 {
        self.shortfall
    }
}

impl AggregateRoot for StockLevel {
    type Id = StreamKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordMovement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub movement: StockMovement,
    pub policy: NegativeStockPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    RecordMovement(RecordMovement),
}

/// Event: MovementRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecorded {
    pub movement: StockMovement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    MovementRecorded(MovementRecorded),
}

impl StockEvent {
    pub fn movement(&self) -> &StockMovement {
        match self {
            StockEvent::MovementRecorded(e) => &e.movement,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::MovementRecorded(_) => "inventory.stock.movement_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.movement().created_at
    }
}

impl Aggregate for StockLevel {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::MovementRecorded(e) => {
                let (on_hand, shortfall) = apply_delta(self.on_hand, e.movement.signed_delta());
                self.on_hand = on_hand;
                self.shortfall = self.shortfall.saturating_add(shortfall);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::RecordMovement(cmd) => self.handle_record(cmd),
        }
    }
}

impl StockLevel {
    fn handle_record(&self, cmd: &RecordMovement) -> Result<Vec<StockEvent>, DomainError> {
        let movement = &cmd.movement;

        if movement.stream_key() != self.key {
            return Err(DomainError::invariant("movement does not belong to this stock stream"));
        }
        if movement.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        if cmd.policy == NegativeStockPolicy::Reject {
            let Some(after) = self.on_hand.checked_add(movement.signed_delta()) else {
                return Err(DomainError::validation(format!(
                    "quantity {} would overflow on-hand stock {}",
                    movement.quantity, self.on_hand
                )));
            };
            if after < 0 {
                return Err(DomainError::invariant(format!(
                    "stock cannot go negative (on hand {}, requested {})",
                    self.on_hand, movement.quantity
                )));
            }
        }

        Ok(vec![StockEvent::MovementRecorded(MovementRecorded {
            movement: movement.clone(),
        })])
    }
}
