//! Write-ahead queue for gateway writes that could not be delivered.
//!
//! The local ledger is authoritative. A write the gateway refuses stays here,
//! in order, until `flush` delivers it. Nothing retries automatically.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};

use stockwise_inventory::StockMovement;

use crate::external::PersistenceGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingWrite {
    Movement(StockMovement),
    Transfer {
        outbound: StockMovement,
        inbound: StockMovement,
    },
}

impl PendingWrite {
    fn deliver(&self, gateway: &dyn PersistenceGateway) -> Result<(), crate::external::GatewayError> {
        match self {
            PendingWrite::Movement(m) => gateway.create_stock_movement(m),
            PendingWrite::Transfer { outbound, inbound } => gateway.transfer_stock(outbound, inbound),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Held in the outbox; `reason` says why.
    Queued { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub delivered: usize,
    pub pending: usize,
}

#[derive(Debug, Default)]
pub struct Outbox {
    pending: Mutex<VecDeque<PendingWrite>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending(&self) -> Vec<PendingWrite> {
        self.pending
            .lock()
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver `write` now, or queue it.
    ///
    /// Writes queue behind earlier pending ones so the gateway sees them in
    /// ledger order.
    pub fn submit(&self, gateway: &dyn PersistenceGateway, write: PendingWrite) -> Delivery {
        let Ok(mut queue) = self.pending.lock() else {
            return Delivery::Queued {
                reason: "outbox lock poisoned".to_string(),
            };
        };

        if !queue.is_empty() {
            debug!(pending = queue.len(), "queueing write behind pending outbox entries");
            queue.push_back(write);
            return Delivery::Queued {
                reason: "earlier writes are still pending".to_string(),
            };
        }

        match write.deliver(gateway) {
            Ok(()) => Delivery::Delivered,
            Err(err) => {
                warn!(error = %err, "gateway write failed; keeping it in the outbox");
                queue.push_back(write);
                Delivery::Queued {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Retry pending writes in order, stopping at the first failure.
    pub fn flush(&self, gateway: &dyn PersistenceGateway) -> FlushReport {
        let Ok(mut queue) = self.pending.lock() else {
            return FlushReport::default();
        };

        let mut delivered = 0;
        while let Some(next) = queue.front() {
            match next.deliver(gateway) {
                Ok(()) => {
                    queue.pop_front();
                    delivered += 1;
                }
                Err(err) => {
                    warn!(error = %err, pending = queue.len(), "outbox flush stopped");
                    break;
                }
            }
        }

        if delivered > 0 {
            info!(delivered, pending = queue.len(), "outbox flushed");
        }

        FlushReport {
            delivered,
            pending: queue.len(),
        }
    }
}
