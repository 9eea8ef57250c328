//! Services and adapters for the inventory core.
//!
//! The ledger store, projector and service layer live here, next to the
//! in-memory stand-ins for every external collaborator.

pub mod advisor;
pub mod config;
pub mod error;
pub mod external;
pub mod ledger;
pub mod ledger_store;
pub mod notifications;
pub mod outbox;
pub mod projections;
pub mod read_model;
pub mod transfer;

mod integration_tests;

pub use advisor::ReorderAdvisor;
pub use config::InventoryConfig;
pub use error::{InventoryError, InventoryResult};
pub use ledger::{StockLedger, STOCK_AGGREGATE_TYPE};
pub use outbox::{Delivery, FlushReport, Outbox, PendingWrite};
pub use transfer::TransferCoordinator;
