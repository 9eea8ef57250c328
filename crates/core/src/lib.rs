//! `stockwise-core`: domain foundation building blocks.
//!
//! Identifiers, the error model, the aggregate contract and the read-only
//! store directory shared by every inventory crate. No infrastructure here.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod id;
pub mod store;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{ArticleId, MovementId, PurchaseOrderId, StoreId, StreamKey, UserId};
pub use store::{InMemoryStoreDirectory, Store, StoreDirectory};
