//! Session state and the pure transitions applied to it.
//!
//! Every remote call made by the synchronizer finishes by turning its result
//! into a [`SyncEvent`]; [`Session::apply`] decides whether that completion is
//! still relevant and, if so, updates the mirror.

use weathernow_auth::Identity;

use crate::snapshot::{Snapshot, SnapshotPatch};

/// Message shown when the initial load of a user's snapshots fails.
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load saved snapshots.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Who issued a mutation: the user and the identity epoch at the time.
///
/// A completion only lands if both still match the session. Reloads do not
/// change the epoch, so a save racing a reload still reaches the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuer {
    pub uid: String,
    pub epoch: u64,
}

/// Completion of a remote call (or an identity transition) to fold into the session.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Signed in as someone, or signed out. Starts a new load generation,
    /// and a new epoch unless the same user was re-emitted.
    IdentityChanged(Option<Identity>),
    /// Same user, fresh query. Starts a new load generation only.
    Reloading,
    Loaded {
        generation: u64,
        snapshots: Vec<Snapshot>,
    },
    LoadFailed {
        generation: u64,
    },
    Created {
        issuer: Issuer,
        snapshot: Snapshot,
    },
    Removed {
        issuer: Issuer,
        id: String,
    },
    Edited {
        issuer: Issuer,
        id: String,
        patch: SnapshotPatch,
    },
}

/// Mirror of one identity's snapshots plus load bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Session {
    identity: Option<Identity>,
    mirror: Vec<Snapshot>,
    load_state: LoadState,
    error: Option<String>,
    /// Bumped whenever the signed-in user changes (including sign-out)
    epoch: u64,
    /// Bumped whenever a load starts
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.mirror
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Issuer token for a mutation started now, or `None` when signed out.
    pub fn issuer(&self) -> Option<Issuer> {
        self.identity.as_ref().map(|identity| Issuer {
            uid: identity.uid.clone(),
            epoch: self.epoch,
        })
    }

    fn uid(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.uid.as_str())
    }

    fn is_current(&self, issuer: &Issuer) -> bool {
        self.epoch == issuer.epoch && self.uid() == Some(issuer.uid.as_str())
    }

    /// Fold an event into the session. Returns `false` if it was stale and ignored.
    pub fn apply(&mut self, event: SyncEvent) -> bool {
        match event {
            SyncEvent::IdentityChanged(identity) => {
                // A refreshed token for the same user keeps the epoch
                if self.uid() != identity.as_ref().map(|i| i.uid.as_str()) {
                    self.epoch += 1;
                }
                self.generation += 1;
                self.mirror.clear();
                self.error = None;
                self.load_state = if identity.is_some() {
                    LoadState::Loading
                } else {
                    LoadState::Idle
                };
                self.identity = identity;
                true
            }
            SyncEvent::Reloading => {
                if self.identity.is_none() {
                    return false;
                }
                self.generation += 1;
                self.error = None;
                self.load_state = LoadState::Loading;
                true
            }
            SyncEvent::Loaded {
                generation,
                snapshots,
            } => {
                if generation != self.generation || self.identity.is_none() {
                    return false;
                }
                self.mirror = snapshots;
                self.error = None;
                self.load_state = LoadState::Ready;
                true
            }
            SyncEvent::LoadFailed { generation } => {
                if generation != self.generation || self.identity.is_none() {
                    return false;
                }
                self.mirror.clear();
                self.error = Some(LOAD_ERROR_MESSAGE.to_string());
                self.load_state = LoadState::Error;
                true
            }
            SyncEvent::Created { issuer, snapshot } => {
                if !self.is_current(&issuer) {
                    return false;
                }
                // A load that started after the write committed already has it
                if self.mirror.iter().any(|s| s.id == snapshot.id) {
                    return true;
                }
                // Newest first: a fresh snapshot always carries the latest date
                self.mirror.insert(0, snapshot);
                true
            }
            SyncEvent::Removed { issuer, id } => {
                if !self.is_current(&issuer) {
                    return false;
                }
                self.mirror.retain(|s| s.id != id);
                true
            }
            SyncEvent::Edited { issuer, id, patch } => {
                if !self.is_current(&issuer) {
                    return false;
                }
                if let Some(snapshot) = self.mirror.iter_mut().find(|s| s.id == id) {
                    patch.apply_to(snapshot);
                }
                true
            }
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            identity: self.identity.clone(),
            snapshots: self.mirror.clone(),
            load_state: self.load_state,
            error: self.error.clone(),
        }
    }
}

/// Owned copy of the session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub identity: Option<Identity>,
    pub snapshots: Vec<Snapshot>,
    pub load_state: LoadState,
    pub error: Option<String>,
}

impl SessionView {
    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
