//! External service contracts and their in-memory stand-ins.

pub mod catalog;
pub mod gateway;
pub mod purchase_orders;
pub mod sales_history;

pub use catalog::{CatalogRepository, InMemoryCatalog};
pub use gateway::{GatewayError, InMemoryPersistenceGateway, PersistenceGateway};
pub use purchase_orders::{InMemoryPurchaseOrders, PurchaseOrderRepository};
pub use sales_history::{InMemorySalesHistory, SalesHistorySource};
