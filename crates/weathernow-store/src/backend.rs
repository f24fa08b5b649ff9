//! Document store backend trait.
//!
//! This module defines the `DocumentStore` trait that abstracts over the
//! different collection backends (in-memory, HTTP API).

use async_trait::async_trait;

use crate::document::{DocumentPatch, Query, SnapshotDocument, StoredDocument, UserScope};
use crate::error::StoreResult;

/// Collection-scoped CRUD plus ordered range queries over a user's snapshots.
///
/// Every method is scoped to a single [`UserScope`]; implementations must
/// never return or touch documents belonging to another user.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in the user's collection, in query order.
    ///
    /// Documents missing the ordering field are left out.
    async fn query(&self, scope: &UserScope, query: Query) -> StoreResult<Vec<StoredDocument>>;

    /// Add a new document and return its store-assigned identifier.
    async fn add(&self, scope: &UserScope, fields: SnapshotDocument) -> StoreResult<String>;

    /// Apply a partial update to an existing document.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if the document doesn't exist.
    async fn update(&self, scope: &UserScope, id: &str, patch: DocumentPatch) -> StoreResult<()>;

    /// Delete a document.
    ///
    /// Deleting an id that does not exist succeeds.
    async fn delete(&self, scope: &UserScope, id: &str) -> StoreResult<()>;
}
