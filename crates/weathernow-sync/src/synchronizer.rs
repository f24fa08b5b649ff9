//! The snapshot synchronizer.
//!
//! Owns one [`Session`] and drives it from identity transitions and
//! user-initiated mutations. Remote calls run without holding the session
//! lock; their results come back as [`SyncEvent`]s that the session may
//! reject as stale.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use weathernow_auth::Identity;
use weathernow_store::{DocumentStore, Query, StoredDocument, Timestamp, UserScope};

use crate::error::SyncError;
use crate::session::{Issuer, LoadState, Session, SessionView, SyncEvent};
use crate::snapshot::{NewSnapshot, Snapshot, SnapshotPatch};

/// Keeps the local snapshot mirror in step with the user's remote collection.
///
/// Cheap to clone; clones share the same session.
pub struct Synchronizer<S: DocumentStore + ?Sized = dyn DocumentStore> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: ?Sized> {
    session: Mutex<Session>,
    /// Bumped after every applied transition
    revision: watch::Sender<u64>,
    cancel: CancellationToken,
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> Clone for Synchronizer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn scope_for(identity: &Identity) -> UserScope {
    let scope = UserScope::new(identity.uid.as_str());
    match &identity.id_token {
        Some(token) => scope.with_token(token.as_str()),
        None => scope,
    }
}

impl<S: DocumentStore + ?Sized> Synchronizer<S> {
    pub fn new(store: Arc<S>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::new()),
                revision,
                cancel: CancellationToken::new(),
                store,
            }),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// Current session state.
    pub fn view(&self) -> SessionView {
        self.inner.session.lock().view()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.inner.session.lock().snapshots().to_vec()
    }

    pub fn load_state(&self) -> LoadState {
        self.inner.session.lock().load_state()
    }

    /// Receiver that changes after every applied state transition.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Stop applying results. In-flight loads are abandoned and later
    /// operations fail with `SyncError::Closed`.
    pub fn shutdown(&self) {
        if !self.inner.cancel.is_cancelled() {
            tracing::info!("Shutting down snapshot synchronizer");
            self.inner.cancel.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn notify(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }

    fn apply(&self, event: SyncEvent) -> bool {
        if self.inner.cancel.is_cancelled() {
            tracing::debug!("Synchronizer shut down, dropping completion");
            return false;
        }
        let applied = self.inner.session.lock().apply(event);
        if applied {
            self.notify();
        }
        applied
    }

    /// React to the identity provider's latest emission.
    ///
    /// Signing out clears the mirror without touching the store. Signing in
    /// clears it and loads the user's snapshots, newest first. A load failure
    /// leaves the session in `LoadState::Error` with a fixed message.
    pub async fn on_identity_change(&self, identity: Option<Identity>) {
        // Failures are recorded in the session
        let _ = self.load(identity).await;
    }

    /// Load the current user's snapshots again.
    ///
    /// Mutations already in flight for the same user still land in the mirror.
    ///
    /// # Errors
    /// `Unauthenticated` when signed out, `RemoteRead` if the query fails.
    pub async fn reload(&self) -> Result<(), SyncError> {
        if self.inner.cancel.is_cancelled() {
            return Err(SyncError::Closed);
        }

        let (scope, generation) = {
            let mut session = self.inner.session.lock();
            let scope = session
                .identity()
                .map(scope_for)
                .ok_or(SyncError::Unauthenticated)?;
            session.apply(SyncEvent::Reloading);
            (scope, session.generation())
        };
        self.notify();

        self.fetch(scope, generation).await
    }

    async fn load(&self, identity: Option<Identity>) -> Result<(), SyncError> {
        if self.inner.cancel.is_cancelled() {
            return Err(SyncError::Closed);
        }

        let scope = identity.as_ref().map(scope_for);
        let generation = {
            let mut session = self.inner.session.lock();
            session.apply(SyncEvent::IdentityChanged(identity));
            session.generation()
        };
        self.notify();

        let Some(scope) = scope else {
            tracing::info!("Signed out, cleared snapshot mirror");
            return Ok(());
        };

        self.fetch(scope, generation).await
    }

    async fn fetch(&self, scope: UserScope, generation: u64) -> Result<(), SyncError> {
        tracing::debug!(
            "Loading snapshots for {} (generation {})",
            scope.uid(),
            generation
        );

        let result = tokio::select! {
            _ = self.inner.cancel.cancelled() => return Err(SyncError::Closed),
            result = self.inner.store.query(&scope, Query::newest_first()) => result,
        };

        match result {
            Ok(docs) => {
                let snapshots: Vec<Snapshot> =
                    docs.into_iter().map(Snapshot::from_document).collect();
                let count = snapshots.len();

                if self.apply(SyncEvent::Loaded {
                    generation,
                    snapshots,
                }) {
                    tracing::info!("Loaded {} snapshots for {}", count, scope.uid());
                } else {
                    tracing::debug!("Discarding stale load for {}", scope.uid());
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error loading snapshots for {}: {}", scope.uid(), e);
                if !self.apply(SyncEvent::LoadFailed { generation }) {
                    tracing::debug!("Discarding stale load failure for {}", scope.uid());
                }
                Err(SyncError::RemoteRead(e))
            }
        }
    }

    fn begin_mutation(&self) -> Result<(Issuer, UserScope), SyncError> {
        if self.inner.cancel.is_cancelled() {
            return Err(SyncError::Closed);
        }

        let session = self.inner.session.lock();
        match (session.identity(), session.issuer()) {
            (Some(identity), Some(issuer)) => Ok((issuer, scope_for(identity))),
            _ => Err(SyncError::Unauthenticated),
        }
    }

    /// Save a new snapshot for the signed-in user and prepend it to the mirror.
    ///
    /// # Errors
    /// `Unauthenticated` when signed out, `RemoteWrite` if the store rejects it.
    pub async fn create(&self, fields: NewSnapshot) -> Result<Snapshot, SyncError> {
        let (issuer, scope) = self.begin_mutation()?;

        let document = fields.into_document(Timestamp::now());
        let id = self
            .inner
            .store
            .add(&scope, document.clone())
            .await
            .map_err(|e| {
                tracing::error!("Error adding snapshot: {}", e);
                SyncError::RemoteWrite(e)
            })?;

        let snapshot = Snapshot::from_document(StoredDocument {
            id,
            fields: document,
        });

        if self.apply(SyncEvent::Created {
            issuer,
            snapshot: snapshot.clone(),
        }) {
            tracing::info!("Saved snapshot {} ({})", snapshot.id, snapshot.city);
        } else {
            tracing::warn!(
                "Snapshot {} saved after {} signed out, not added to mirror",
                snapshot.id,
                scope.uid()
            );
        }
        Ok(snapshot)
    }

    /// Delete a snapshot remotely, then drop it from the mirror.
    ///
    /// # Errors
    /// `Unauthenticated` when signed out, `RemoteWrite` if the store rejects it.
    pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
        let (issuer, scope) = self.begin_mutation()?;

        self.inner.store.delete(&scope, id).await.map_err(|e| {
            tracing::error!("Error deleting snapshot {}: {}", id, e);
            SyncError::RemoteWrite(e)
        })?;

        if self.apply(SyncEvent::Removed {
            issuer,
            id: id.to_string(),
        }) {
            tracing::info!("Deleted snapshot {}", id);
        } else {
            tracing::warn!("Snapshot {} deleted after identity changed", id);
        }
        Ok(())
    }

    /// Apply a partial update remotely, then merge it into the mirror entry.
    ///
    /// # Errors
    /// `Unauthenticated` when signed out, `RemoteWrite` if the store rejects it.
    pub async fn edit(&self, id: &str, patch: SnapshotPatch) -> Result<(), SyncError> {
        let (issuer, scope) = self.begin_mutation()?;

        self.inner
            .store
            .update(&scope, id, patch.clone().into_document_patch())
            .await
            .map_err(|e| {
                tracing::error!("Error updating snapshot {}: {}", id, e);
                SyncError::RemoteWrite(e)
            })?;

        if self.apply(SyncEvent::Edited {
            issuer,
            id: id.to_string(),
            patch,
        }) {
            tracing::info!("Updated snapshot {}", id);
        } else {
            tracing::warn!("Snapshot {} updated after identity changed", id);
        }
        Ok(())
    }
}
