pub mod error;
pub mod identity;
pub mod provider;
pub mod storage;

pub use error::AuthError;
pub use identity::Identity;
pub use provider::{AuthState, IdentityProvider, LocalIdentityProvider, SignInFlow, StaticSignIn};
pub use storage::SessionStorage;
