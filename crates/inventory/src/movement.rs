use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockwise_core::{ArticleId, DomainError, MovementId, StoreId, StreamKey, UserId};

/// Direction of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    In,
    Out,
    TransferIn,
    TransferOut,
}

impl MovementType {
    /// +1 for inbound movements, -1 for outbound.
    pub fn sign(self) -> i64 {
        match self {
            MovementType::In | MovementType::TransferIn => 1,
            MovementType::Out | MovementType::TransferOut => -1,
        }
    }

    pub fn is_transfer(self) -> bool {
        matches!(self, MovementType::TransferIn | MovementType::TransferOut)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Manual,
    Transfer,
    Sale,
    Purchase,
    Adjustment,
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub store_id: StoreId,
    pub article_id: ArticleId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub notes: Option<String>,
    pub performed_by: UserId,
    pub reference_type: ReferenceType,
    /// Correlation id; both legs of a transfer share one.
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn new(
        store_id: StoreId,
        article_id: ArticleId,
        movement_type: MovementType,
        quantity: i64,
        performed_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive (got {quantity})"
            )));
        }

        let reference_type = if movement_type.is_transfer() {
            ReferenceType::Transfer
        } else {
            ReferenceType::Manual
        };

        Ok(Self {
            id: MovementId::new(),
            store_id,
            article_id,
            movement_type,
            quantity,
            notes: None,
            performed_by,
            reference_type,
            reference_id: None,
            created_at,
        })
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_reference(mut self, reference_type: ReferenceType, reference_id: Option<Uuid>) -> Self {
        self.reference_type = reference_type;
        self.reference_id = reference_id;
        self
    }

    pub fn stream_key(&self) -> StreamKey {
        StreamKey::new(self.store_id, self.article_id)
    }

    /// Quantity with the direction's sign applied.
    pub fn signed_delta(&self) -> i64 {
        self.movement_type.sign() * self.quantity
    }
}

/// Ledger query. `None` fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub store_id: Option<StoreId>,
    pub article_id: Option<ArticleId>,
    pub since: Option<DateTime<Utc>>,
    pub movement_type: Option<MovementType>,
}

impl MovementFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn article(mut self, article_id: ArticleId) -> Self {
        self.article_id = Some(article_id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn of_type(mut self, movement_type: MovementType) -> Self {
        self.movement_type = Some(movement_type);
        self
    }

    pub fn matches(&self, movement: &StockMovement) -> bool {
        self.store_id.is_none_or(|s| s == movement.store_id)
            && self.article_id.is_none_or(|a| a == movement.article_id)
            && self.since.is_none_or(|t| movement.created_at >= t)
            && self.movement_type.is_none_or(|m| m == movement.movement_type)
    }
}
