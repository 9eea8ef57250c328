use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{ArticleId, DomainError, PurchaseOrderId, StoreId, UserId};

use crate::ReorderSuggestion;

/// Purchase order status lifecycle. Only drafts are raised here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub line_no: u32,
    pub article_id: ArticleId,
    pub quantity: i64,
    pub unit_cost: u64,
    pub line_total: u64,
}

/// Draft order raised from a batch of reorder suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub store_id: StoreId,
    pub lines: Vec<PurchaseOrderLine>,
    pub total_cost: u64,
    pub status: PurchaseOrderStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Build a draft from `suggestions`, one line per suggestion.
    ///
    /// Fails on an empty batch, a suggestion for another store, or a
    /// non-positive quantity.
    pub fn draft(
        store_id: StoreId,
        suggestions: &[ReorderSuggestion],
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if suggestions.is_empty() {
            return Err(DomainError::validation("reorder batch is empty"));
        }

        let mut lines = Vec::with_capacity(suggestions.len());
        for (idx, s) in suggestions.iter().enumerate() {
            if s.store_id != store_id {
                return Err(DomainError::validation(format!(
                    "suggestion for {} belongs to store {}, not {store_id}",
                    s.article_name, s.store_id
                )));
            }
            if s.suggested_quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "suggested quantity for {} must be positive",
                    s.article_name
                )));
            }

            let quantity = s.suggested_quantity;
            lines.push(PurchaseOrderLine {
                line_no: idx as u32 + 1,
                article_id: s.article_id,
                quantity,
                unit_cost: s.unit_cost,
                line_total: (quantity as u64).saturating_mul(s.unit_cost),
            });
        }

        let total_cost = lines.iter().map(|l| l.line_total).fold(0u64, u64::saturating_add);

        Ok(Self {
            id: PurchaseOrderId::new(),
            store_id,
            lines,
            total_cost,
            status: PurchaseOrderStatus::Draft,
            created_by,
            created_at,
        })
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).fold(0i64, i64::saturating_add)
    }
}
