//! Client-side snapshot synchronization for Weather Now.
//!
//! Keeps an in-memory mirror of the signed-in user's snapshot collection
//! consistent with the remote document store across identity transitions
//! and create/edit/remove operations.

pub mod error;
pub mod serialize;
pub mod session;
pub mod snapshot;
pub mod synchronizer;

pub use error::SyncError;
pub use serialize::{serialize_date, DISPLAY_FORMAT};
pub use session::{Issuer, LoadState, Session, SessionView, SyncEvent, LOAD_ERROR_MESSAGE};
pub use snapshot::{NewSnapshot, Snapshot, SnapshotPatch};
pub use synchronizer::Synchronizer;
