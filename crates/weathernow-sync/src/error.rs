use thiserror::Error;
use weathernow_store::StoreError;

/// Errors returned by synchronizer operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Operation requires a signed-in user. Nothing was sent to the store.
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Failed to read snapshots: {0}")]
    RemoteRead(#[source] StoreError),

    /// The store rejected a create, edit or remove. The mirror is unchanged.
    #[error("Failed to write snapshot: {0}")]
    RemoteWrite(#[source] StoreError),

    #[error("Synchronizer has been shut down")]
    Closed,
}

impl SyncError {
    /// Underlying store error, if the failure came from the store.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            SyncError::RemoteRead(e) | SyncError::RemoteWrite(e) => Some(e),
            _ => None,
        }
    }
}
