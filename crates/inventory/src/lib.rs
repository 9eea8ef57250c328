//! Inventory domain module (event-sourced).
//!
//! Business rules for multi-store stock control, implemented purely as
//! deterministic domain logic (no IO, no storage, no clocks).

pub mod alert;
pub mod article;
pub mod forecast;
pub mod movement;
pub mod purchase_order;
pub mod reorder;
pub mod stock;
pub mod transfer;

pub use alert::{classify, scan, AlertLevel, StockAlert};
pub use article::{Article, ArticleStatus};
pub use forecast::{forecast, DaysUntilStockout, SaleLine, VelocityForecast, DEFAULT_WINDOW_DAYS};
pub use movement::{MovementFilter, MovementType, ReferenceType, StockMovement};
pub use purchase_order::{PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus};
pub use reorder::{rank, suggest, ReorderSuggestion, REPLENISHMENT_MULTIPLIER};
pub use stock::{
    apply_delta, MovementRecorded, NegativeStockPolicy, RecordMovement, StockCommand, StockEvent,
    StockLevel,
};
pub use transfer::{TransferPlan, TransferRequest};
