//! Store-partitioned read model storage abstractions.

pub mod store_scoped;

pub use store_scoped::{InMemoryStoreScopedStore, StoreScopedStore};
