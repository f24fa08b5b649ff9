//! Identity provider: publishes the current authenticated identity and
//! drives sign-in / sign-out.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::AuthError;
use crate::identity::Identity;
use crate::storage::SessionStorage;

/// Authentication state as observed by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Initial state has not been determined yet
    #[default]
    Resolving,
    SignedOut,
    SignedIn(Identity),
}

impl AuthState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthState::SignedIn(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, AuthState::Resolving)
    }

    fn from_identity(identity: Option<Identity>) -> Self {
        match identity {
            Some(identity) => AuthState::SignedIn(identity),
            None => AuthState::SignedOut,
        }
    }
}

/// Source of identity transitions.
///
/// Subscribers see one emission once the initial state is resolved and one
/// per transition afterwards.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to authentication state changes.
    fn subscribe(&self) -> watch::Receiver<AuthState>;

    /// The currently signed-in identity, if any.
    fn current(&self) -> Option<Identity>;

    /// Run the interactive sign-in flow.
    async fn sign_in(&self) -> Result<Identity, AuthError>;

    /// Sign the current user out.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// The interactive part of signing in (popup, device code, ...).
#[async_trait]
pub trait SignInFlow: Send + Sync {
    async fn authenticate(&self) -> Result<Identity, AuthError>;
}

/// Sign-in flow that always yields the same identity.
#[derive(Debug, Clone)]
pub struct StaticSignIn {
    identity: Identity,
}

impl StaticSignIn {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl SignInFlow for StaticSignIn {
    async fn authenticate(&self) -> Result<Identity, AuthError> {
        Ok(self.identity.clone())
    }
}

/// Identity provider backed by a watch channel, with optional session
/// persistence so a restart restores the previous sign-in.
pub struct LocalIdentityProvider {
    state: watch::Sender<AuthState>,
    flow: Arc<dyn SignInFlow>,
    storage: Option<SessionStorage>,
}

impl LocalIdentityProvider {
    pub fn new(flow: Arc<dyn SignInFlow>) -> Self {
        let (state, _) = watch::channel(AuthState::Resolving);
        Self {
            state,
            flow,
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: SessionStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Determine the initial state and emit it.
    ///
    /// Restores a persisted, unexpired session when storage is configured.
    /// An unreadable or expired session resolves to signed out.
    pub fn resolve(&self) -> Option<Identity> {
        let restored = match &self.storage {
            Some(storage) => match storage.load() {
                Ok(Some(identity)) if identity.is_expired() => {
                    tracing::info!("Stored session for {} has expired", identity.uid);
                    if let Err(e) = storage.clear() {
                        tracing::warn!("Failed to clear expired session: {}", e);
                    }
                    None
                }
                Ok(identity) => identity,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable session: {}", e);
                    None
                }
            },
            None => None,
        };

        self.publish(AuthState::from_identity(restored.clone()));
        restored
    }

    fn publish(&self, next: AuthState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });

        if changed {
            match &next {
                AuthState::SignedIn(identity) => {
                    tracing::info!("Auth state: signed in as {}", identity.uid)
                }
                AuthState::SignedOut => tracing::info!("Auth state: signed out"),
                AuthState::Resolving => tracing::debug!("Auth state: resolving"),
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn current(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    async fn sign_in(&self) -> Result<Identity, AuthError> {
        let identity = self.flow.authenticate().await.map_err(|e| {
            tracing::error!("Error signing in: {}", e);
            e
        })?;

        if let Some(storage) = &self.storage {
            storage
                .store(&identity)
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }

        self.publish(AuthState::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(storage) = &self.storage {
            storage
                .clear()
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }

        self.publish(AuthState::SignedOut);
        Ok(())
    }
}
