//! Projection implementations (read model builders).
//!
//! Projections consume committed ledger envelopes and are:
//! - **Rebuildable** from the ledger
//! - **Store-partitioned**
//! - **Idempotent** under at-least-once delivery

pub mod inventory_stock;

pub use inventory_stock::{InventoryProjector, ProjectionError, StockReadModel};
