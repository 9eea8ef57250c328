//! Inter-store transfer planning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockwise_core::{ArticleId, DomainError, StoreId, UserId};

use crate::{MovementType, ReferenceType, StockMovement};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_store_id: StoreId,
    pub to_store_id: StoreId,
    pub article_id: ArticleId,
    pub quantity: i64,
    pub actor_id: UserId,
    pub notes: Option<String>,
}

impl TransferRequest {
    pub fn new(from_store_id: StoreId, to_store_id: StoreId, article_id: ArticleId, quantity: i64, actor_id: UserId) -> Self {
        Self {
            from_store_id,
            to_store_id,
            article_id,
            quantity,
            actor_id,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.from_store_id == self.to_store_id {
            return Err(DomainError::validation("source and destination store must differ"));
        }
        if self.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "transfer quantity must be positive (got {})",
                self.quantity
            )));
        }
        Ok(())
    }

    /// Build both legs. They share `reference_id`, quantity and note.
    pub fn plan(&self, now: DateTime<Utc>) -> Result<TransferPlan, DomainError> {
        self.validate()?;

        let reference_id = Uuid::now_v7();
        let note = self.correlation_note(reference_id);

        let leg = |store_id: StoreId, movement_type: MovementType| {
            StockMovement::new(store_id, self.article_id, movement_type, self.quantity, self.actor_id, now).map(|m| {
                m.with_notes(Some(note.clone()))
                    .with_reference(ReferenceType::Transfer, Some(reference_id))
            })
        };

        Ok(TransferPlan {
            reference_id,
            outbound: leg(self.from_store_id, MovementType::TransferOut)?,
            inbound: leg(self.to_store_id, MovementType::TransferIn)?,
        })
    }

    fn correlation_note(&self, reference_id: Uuid) -> String {
        let base = format!(
            "Transfer {reference_id}: {} -> {}",
            self.from_store_id, self.to_store_id
        );
        match self.notes.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("{base} ({extra})"),
            _ => base,
        }
    }
}

/// The two ledger rows of one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub reference_id: Uuid,
    pub outbound: StockMovement,
    pub inbound: StockMovement,
}
