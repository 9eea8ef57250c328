use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use stockwise_inventory::StockMovement;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("persistence service unavailable: {0}")]
    Unavailable(String),

    #[error("persistence service rejected the write: {0}")]
    Rejected(String),
}

/// Remote persistence for ledger rows.
pub trait PersistenceGateway: Send + Sync {
    fn create_stock_movement(&self, movement: &StockMovement) -> Result<(), GatewayError>;

    /// Persist both legs of a transfer as one server-side operation.
    fn transfer_stock(&self, outbound: &StockMovement, inbound: &StockMovement) -> Result<(), GatewayError>;
}

impl<G> PersistenceGateway for Arc<G>
where
    G: PersistenceGateway + ?Sized,
{
    fn create_stock_movement(&self, movement: &StockMovement) -> Result<(), GatewayError> {
        (**self).create_stock_movement(movement)
    }

    fn transfer_stock(&self, outbound: &StockMovement, inbound: &StockMovement) -> Result<(), GatewayError> {
        (**self).transfer_stock(outbound, inbound)
    }
}

/// In-memory gateway for tests/dev. Can be switched offline to simulate outages.
#[derive(Debug, Default)]
pub struct InMemoryPersistenceGateway {
    rows: RwLock<Vec<StockMovement>>,
    offline: AtomicBool,
}

impl InMemoryPersistenceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Rows persisted so far, in arrival order.
    pub fn persisted(&self) -> Vec<StockMovement> {
        self.rows.read().map(|r| r.clone()).unwrap_or_default()
    }

    fn ensure_online(&self) -> Result<(), GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn push(&self, rows: &[&StockMovement]) -> Result<(), GatewayError> {
        let mut stored = self
            .rows
            .write()
            .map_err(|_| GatewayError::Unavailable("lock poisoned".to_string()))?;
        stored.extend(rows.iter().map(|m| (*m).clone()));
        Ok(())
    }
}

impl PersistenceGateway for InMemoryPersistenceGateway {
    fn create_stock_movement(&self, movement: &StockMovement) -> Result<(), GatewayError> {
        self.ensure_online()?;
        self.push(&[movement])
    }

    fn transfer_stock(&self, outbound: &StockMovement, inbound: &StockMovement) -> Result<(), GatewayError> {
        self.ensure_online()?;
        if outbound.reference_id.is_none() || outbound.reference_id != inbound.reference_id {
            return Err(GatewayError::Rejected("transfer legs must share a reference id".to_string()));
        }
        self.push(&[outbound, inbound])
    }
}
