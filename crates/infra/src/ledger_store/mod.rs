//! Append-only ledger store boundary.
//!
//! Storage abstraction for the per-`(store, article)` movement streams,
//! without storage assumptions beyond append-only and atomic batches.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, LedgerStoreError, StoredEvent, StreamAppend, UncommittedEvent};
