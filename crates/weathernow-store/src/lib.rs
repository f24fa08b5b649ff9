//! Per-user snapshot document store for Weather Now.
//!
//! Provides the `DocumentStore` trait plus in-memory and HTTP backends.

pub mod backend;
pub mod document;
pub mod error;
pub mod http;
pub mod memory;

pub use backend::DocumentStore;
pub use document::{
    DateValue, DocumentPatch, Query, SnapshotDocument, StoredDocument, Timestamp, UserScope,
};
pub use error::{StoreError, StoreResult};
pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;
