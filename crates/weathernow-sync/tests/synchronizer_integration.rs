//! Integration tests driving the Synchronizer against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use weathernow_auth::Identity;
use weathernow_store::{
    DocumentPatch, DocumentStore, MemoryDocumentStore, Query, SnapshotDocument, StoreResult,
    StoredDocument, Timestamp, UserScope,
};
use weathernow_sync::{LoadState, NewSnapshot, SnapshotPatch, SyncError, Synchronizer};

fn doc(city: &str, seconds: i64) -> SnapshotDocument {
    SnapshotDocument {
        city: city.to_string(),
        country: "XX".to_string(),
        temp: 18.5,
        description: "Cloudy".to_string(),
        icon: "c03d".to_string(),
        date: Some(
            Timestamp {
                seconds,
                nanoseconds: 0,
            }
            .into(),
        ),
        note: Some(String::new()),
    }
}

fn lagos() -> NewSnapshot {
    NewSnapshot {
        city: "Lagos".to_string(),
        country: "NG".to_string(),
        temp: 31.0,
        description: "Clear".to_string(),
        icon: "c01d".to_string(),
    }
}

fn user(uid: &str) -> Identity {
    Identity::new(uid)
}

fn cities<S: DocumentStore + ?Sized>(sync: &Synchronizer<S>) -> Vec<String> {
    sync.snapshots().into_iter().map(|s| s.city).collect()
}

/// Store whose queries (for one user) and adds can be held open until released.
#[derive(Default)]
struct GatedStore {
    inner: MemoryDocumentStore,
    slow_uid: Option<String>,
    gate_adds: bool,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    async fn hold(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn query(&self, scope: &UserScope, query: Query) -> StoreResult<Vec<StoredDocument>> {
        if self.slow_uid.as_deref() == Some(scope.uid()) {
            self.hold().await;
        }
        self.inner.query(scope, query).await
    }

    async fn add(&self, scope: &UserScope, fields: SnapshotDocument) -> StoreResult<String> {
        if self.gate_adds {
            self.hold().await;
        }
        self.inner.add(scope, fields).await
    }

    async fn update(&self, scope: &UserScope, id: &str, patch: DocumentPatch) -> StoreResult<()> {
        self.inner.update(scope, id, patch).await
    }

    async fn delete(&self, scope: &UserScope, id: &str) -> StoreResult<()> {
        self.inner.delete(scope, id).await
    }
}

#[tokio::test]
async fn test_identity_switch_leaves_only_new_users_snapshots() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(&UserScope::new("a"), doc("Accra", 100));
    store.insert(&UserScope::new("b"), doc("Berlin", 200));
    store.insert(&UserScope::new("b"), doc("Bern", 300));
    let sync = Synchronizer::new(store);

    sync.on_identity_change(None).await;
    sync.on_identity_change(Some(user("a"))).await;
    assert_eq!(cities(&sync), vec!["Accra"]);

    sync.on_identity_change(None).await;
    assert!(sync.snapshots().is_empty());
    assert_eq!(sync.load_state(), LoadState::Idle);

    sync.on_identity_change(Some(user("b"))).await;
    assert_eq!(cities(&sync), vec!["Bern", "Berlin"]);
    assert_eq!(sync.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn test_sign_out_does_not_query() {
    let store = Arc::new(MemoryDocumentStore::new());
    let sync = Synchronizer::new(store.clone());

    sync.on_identity_change(None).await;
    assert_eq!(store.call_count(), 0);
    assert_eq!(sync.load_state(), LoadState::Idle);
}

#[tokio::test]
async fn test_empty_collection_is_ready() {
    let sync = Synchronizer::new(Arc::new(MemoryDocumentStore::new()));

    sync.on_identity_change(Some(user("a"))).await;
    let view = sync.view();
    assert!(view.snapshots.is_empty());
    assert_eq!(view.load_state, LoadState::Ready);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_load_failure_sets_error() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(&UserScope::new("a"), doc("Accra", 100));
    store.set_fail_reads(true);
    let sync = Synchronizer::new(store.clone());

    sync.on_identity_change(Some(user("a"))).await;
    let view = sync.view();
    assert!(view.snapshots.is_empty());
    assert_eq!(view.load_state, LoadState::Error);
    assert!(!view.error.unwrap_or_default().is_empty());

    // A user-initiated retry reports the failure and then recovers
    assert!(matches!(sync.reload().await, Err(SyncError::RemoteRead(_))));
    store.set_fail_reads(false);
    sync.reload().await.unwrap();
    assert_eq!(cities(&sync), vec!["Accra"]);
    assert_eq!(sync.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn test_create_prepends_store_assigned_snapshot() {
    let store = Arc::new(MemoryDocumentStore::new());
    let sync = Synchronizer::new(store.clone());
    sync.on_identity_change(Some(user("a"))).await;

    let created = sync.create(lagos()).await.unwrap();

    let mirror = sync.snapshots();
    assert_eq!(mirror.len(), 1);
    assert_eq!(mirror[0], created);
    assert_eq!(created.note, "");
    assert_eq!(created.city, "Lagos");
    assert_eq!(created.temp, 31.0);
    assert!(!created.date.is_empty());

    let stored = store.get(&UserScope::new("a"), &created.id).unwrap();
    assert_eq!(stored.fields.note.as_deref(), Some(""));
    assert!(stored.fields.date.is_some());
}

#[tokio::test]
async fn test_create_goes_in_front_of_loaded_snapshots() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(&UserScope::new("a"), doc("Accra", 100));
    let sync = Synchronizer::new(store);
    sync.on_identity_change(Some(user("a"))).await;

    sync.create(lagos()).await.unwrap();
    assert_eq!(cities(&sync), vec!["Lagos", "Accra"]);
}

#[tokio::test]
async fn test_create_then_remove() {
    let store = Arc::new(MemoryDocumentStore::new());
    let sync = Synchronizer::new(store.clone());
    sync.on_identity_change(Some(user("a"))).await;

    let created = sync.create(lagos()).await.unwrap();
    sync.remove(&created.id).await.unwrap();

    assert!(sync.snapshots().iter().all(|s| s.id != created.id));
    assert!(store.get(&UserScope::new("a"), &created.id).is_none());
}

#[tokio::test]
async fn test_edit_survives_reload() {
    let store = Arc::new(MemoryDocumentStore::new());
    let sync = Synchronizer::new(store);
    sync.on_identity_change(Some(user("a"))).await;

    let created = sync.create(lagos()).await.unwrap();
    sync.edit(&created.id, SnapshotPatch::note("x")).await.unwrap();
    assert_eq!(sync.snapshots()[0].note, "x");

    sync.on_identity_change(Some(user("a"))).await;
    let reloaded = sync.snapshots();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].id, created.id);
    assert_eq!(reloaded[0].note, "x");
}

#[tokio::test]
async fn test_anonymous_mutations_are_rejected_without_io() {
    let store = Arc::new(MemoryDocumentStore::new());
    let sync = Synchronizer::new(store.clone());
    sync.on_identity_change(None).await;
    let before = sync.view();

    assert!(matches!(
        sync.create(lagos()).await,
        Err(SyncError::Unauthenticated)
    ));
    assert!(matches!(
        sync.remove("whatever").await,
        Err(SyncError::Unauthenticated)
    ));
    assert!(matches!(
        sync.edit("whatever", SnapshotPatch::note("x")).await,
        Err(SyncError::Unauthenticated)
    ));
    assert!(matches!(sync.reload().await, Err(SyncError::Unauthenticated)));

    assert_eq!(store.call_count(), 0);
    assert_eq!(sync.view(), before);
}

#[tokio::test]
async fn test_failed_writes_leave_mirror_untouched() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(&UserScope::new("a"), doc("Accra", 100));
    let sync = Synchronizer::new(store.clone());
    sync.on_identity_change(Some(user("a"))).await;
    let before = sync.snapshots();
    let id = before[0].id.clone();

    store.set_fail_writes(true);
    assert!(matches!(
        sync.create(lagos()).await,
        Err(SyncError::RemoteWrite(_))
    ));
    assert!(matches!(sync.remove(&id).await, Err(SyncError::RemoteWrite(_))));
    assert!(matches!(
        sync.edit(&id, SnapshotPatch::note("x")).await,
        Err(SyncError::RemoteWrite(_))
    ));

    assert_eq!(sync.snapshots(), before);
    assert_eq!(sync.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn test_edit_of_missing_document_surfaces_error() {
    let sync = Synchronizer::new(Arc::new(MemoryDocumentStore::new()));
    sync.on_identity_change(Some(user("a"))).await;

    let err = sync
        .edit("does-not-exist", SnapshotPatch::note("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteWrite(_)));
    assert!(err.store_error().is_some());
}

#[tokio::test]
async fn test_stale_load_is_discarded() {
    let store = Arc::new(GatedStore {
        slow_uid: Some("a".to_string()),
        ..GatedStore::default()
    });
    store.inner.insert(&UserScope::new("a"), doc("Accra", 100));
    store.inner.insert(&UserScope::new("b"), doc("Berlin", 200));
    let sync = Synchronizer::new(store.clone());

    let slow = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.on_identity_change(Some(user("a"))).await })
    };
    store.entered.notified().await;

    sync.on_identity_change(Some(user("b"))).await;
    assert_eq!(cities(&sync), vec!["Berlin"]);

    store.release.notify_one();
    slow.await.unwrap();

    assert_eq!(cities(&sync), vec!["Berlin"]);
    assert_eq!(sync.view().identity.map(|i| i.uid), Some("b".to_string()));
    assert_eq!(sync.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn test_create_completing_after_sign_out_is_dropped() {
    let store = Arc::new(GatedStore {
        gate_adds: true,
        ..GatedStore::default()
    });
    let sync = Synchronizer::new(store.clone());
    sync.on_identity_change(Some(user("a"))).await;

    let pending = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.create(lagos()).await })
    };
    store.entered.notified().await;

    sync.on_identity_change(None).await;
    store.release.notify_one();

    // The remote write went through, but the mirror belongs to nobody now
    let created = pending.await.unwrap().unwrap();
    assert!(sync.snapshots().is_empty());
    assert!(store.inner.get(&UserScope::new("a"), &created.id).is_some());
}

#[tokio::test]
async fn test_reload_keeps_in_flight_create() {
    let store = Arc::new(GatedStore {
        gate_adds: true,
        ..GatedStore::default()
    });
    store.inner.insert(&UserScope::new("a"), doc("Accra", 100));
    let sync = Synchronizer::new(store.clone());
    sync.on_identity_change(Some(user("a"))).await;

    let pending = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.create(lagos()).await })
    };
    store.entered.notified().await;

    // The reload's query runs before the add commits, so it can't see Lagos
    sync.reload().await.unwrap();
    assert_eq!(cities(&sync), vec!["Accra"]);

    store.release.notify_one();
    let created = pending.await.unwrap().unwrap();

    assert_eq!(cities(&sync), vec!["Lagos", "Accra"]);
    assert_eq!(sync.snapshots()[0].id, created.id);
    assert_eq!(sync.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn test_refreshed_token_keeps_in_flight_create() {
    let store = Arc::new(GatedStore {
        gate_adds: true,
        ..GatedStore::default()
    });
    let sync = Synchronizer::new(store.clone());
    sync.on_identity_change(Some(user("a"))).await;

    let pending = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.create(lagos()).await })
    };
    store.entered.notified().await;

    sync.on_identity_change(Some(user("a").with_token("refreshed", None)))
        .await;
    store.release.notify_one();

    let created = pending.await.unwrap().unwrap();
    assert_eq!(cities(&sync), vec!["Lagos"]);
    assert_eq!(sync.snapshots()[0].id, created.id);
}

#[tokio::test]
async fn test_subscribers_see_transitions() {
    let sync = Synchronizer::new(Arc::new(MemoryDocumentStore::new()));
    let mut rx = sync.subscribe();
    let start = *rx.borrow_and_update();

    sync.on_identity_change(Some(user("a"))).await;
    assert!(rx.has_changed().unwrap());
    let after_load = *rx.borrow_and_update();
    assert!(after_load >= start + 2);

    sync.create(lagos()).await.unwrap();
    assert!(rx.has_changed().unwrap());
}

#[tokio::test]
async fn test_shutdown_abandons_in_flight_load() {
    let store = Arc::new(GatedStore {
        slow_uid: Some("a".to_string()),
        ..GatedStore::default()
    });
    store.inner.insert(&UserScope::new("a"), doc("Accra", 100));
    let sync = Synchronizer::new(store.clone());

    let loading = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.on_identity_change(Some(user("a"))).await })
    };
    store.entered.notified().await;

    sync.shutdown();
    loading.await.unwrap();

    assert!(sync.is_shut_down());
    assert!(sync.snapshots().is_empty());
    assert_eq!(sync.load_state(), LoadState::Loading);
    assert!(matches!(sync.create(lagos()).await, Err(SyncError::Closed)));
}
