//! In-process document store.
//!
//! Behaves like the remote store (per-user partitioning, store-assigned ids,
//! newest-first queries that skip documents without a date) and supports
//! failure injection so callers can exercise their error paths.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::DocumentStore;
use crate::document::{DocumentPatch, Query, SnapshotDocument, StoredDocument, UserScope};
use crate::error::{StoreError, StoreResult};

/// In-memory document store keyed by collection path.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<StoredDocument>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `query` fail with `StoreError::Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, AtomicOrdering::SeqCst);
    }

    /// Make every subsequent `add`/`update`/`delete` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    /// Number of trait calls received so far (seeding and inspection excluded).
    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Seed a document directly, bypassing failure injection and call counting.
    pub fn insert(&self, scope: &UserScope, fields: SnapshotDocument) -> String {
        let id = new_document_id();
        self.collections
            .lock()
            .entry(scope.collection_path())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                fields,
            });
        id
    }

    /// Current contents of a user's collection in insertion order.
    pub fn documents(&self, scope: &UserScope) -> Vec<StoredDocument> {
        self.collections
            .lock()
            .get(&scope.collection_path())
            .cloned()
            .unwrap_or_default()
    }

    /// Look up one document by id.
    pub fn get(&self, scope: &UserScope, id: &str) -> Option<StoredDocument> {
        self.documents(scope).into_iter().find(|d| d.id == id)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }

    fn check_writes(&self) -> StoreResult<()> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::unavailable("writes are failing"));
        }
        Ok(())
    }
}

fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn by_date(a: &SnapshotDocument, b: &SnapshotDocument) -> Ordering {
    match (&a.date, &b.date) {
        (Some(x), Some(y)) => x.store_cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, scope: &UserScope, query: Query) -> StoreResult<Vec<StoredDocument>> {
        self.record_call();
        if self.fail_reads.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::unavailable("reads are failing"));
        }

        let mut docs: Vec<StoredDocument> = self
            .documents(scope)
            .into_iter()
            .filter(|d| d.fields.date.is_some())
            .collect();

        match query {
            Query::NewestFirst => docs.sort_by(|a, b| by_date(&b.fields, &a.fields)),
        }

        tracing::debug!(
            "Memory store query on {} returned {} documents",
            scope.collection_path(),
            docs.len()
        );
        Ok(docs)
    }

    async fn add(&self, scope: &UserScope, fields: SnapshotDocument) -> StoreResult<String> {
        self.record_call();
        self.check_writes()?;
        Ok(self.insert(scope, fields))
    }

    async fn update(&self, scope: &UserScope, id: &str, patch: DocumentPatch) -> StoreResult<()> {
        self.record_call();
        self.check_writes()?;

        let mut collections = self.collections.lock();
        let doc = collections
            .get_mut(&scope.collection_path())
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::not_found(id))?;
        patch.apply(&mut doc.fields);
        Ok(())
    }

    async fn delete(&self, scope: &UserScope, id: &str) -> StoreResult<()> {
        self.record_call();
        self.check_writes()?;

        if let Some(docs) = self.collections.lock().get_mut(&scope.collection_path()) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }
}
