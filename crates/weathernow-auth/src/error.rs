use thiserror::Error;

/// Identity provider errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("Session storage error: {0}")]
    Storage(String),
}
