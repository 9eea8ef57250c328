//! Inter-store transfers on top of the stock ledger.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use stockwise_auth::StoreAction;
use stockwise_core::{ArticleId, StoreId, UserId};
use stockwise_events::{EventBus, EventEnvelope};
use stockwise_inventory::{TransferPlan, TransferRequest};

use crate::error::InventoryResult;
use crate::ledger::StockLedger;
use crate::ledger_store::LedgerStore;
use crate::projections::StockReadModel;
use crate::read_model::StoreScopedStore;

/// Moves stock between two stores as one ledger commit.
///
/// The actor needs `manage_stock` on both stores. Both legs land in the
/// ledger (and the projection) together, or neither does.
pub struct TransferCoordinator<S, M, B>
where
    M: StoreScopedStore<ArticleId, StockReadModel>,
{
    ledger: Arc<StockLedger<S, M, B>>,
}

impl<S, M, B> TransferCoordinator<S, M, B>
where
    S: LedgerStore,
    M: StoreScopedStore<ArticleId, StockReadModel>,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ledger: Arc<StockLedger<S, M, B>>) -> Self {
        Self { ledger }
    }

    #[instrument(
        skip_all,
        fields(from_store_id = %from_store_id, to_store_id = %to_store_id, article_id = %article_id, quantity)
    )]
    pub fn transfer(
        &self,
        from_store_id: StoreId,
        to_store_id: StoreId,
        article_id: ArticleId,
        quantity: i64,
        actor_id: UserId,
        notes: Option<String>,
    ) -> InventoryResult<TransferPlan> {
        let mut request = TransferRequest::new(from_store_id, to_store_id, article_id, quantity, actor_id);
        if let Some(notes) = notes {
            request = request.with_notes(notes);
        }
        self.execute(&request)
    }

    /// Validate, authorize, then commit both legs of `request`.
    pub fn execute(&self, request: &TransferRequest) -> InventoryResult<TransferPlan> {
        request.validate()?;

        let gate = self.ledger.gate();
        gate.check(request.actor_id, request.from_store_id, StoreAction::ManageStock)?;
        gate.check(request.actor_id, request.to_store_id, StoreAction::ManageStock)?;

        let plan = self.ledger.record_transfer(request)?;

        info!(
            reference_id = %plan.reference_id,
            actor_id = %request.actor_id,
            "stock transferred"
        );
        Ok(plan)
    }
}
