use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated principal.
///
/// `uid` is stable for the lifetime of the account and partitions the
/// user's snapshot collection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user id
    pub uid: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Bearer token for remote calls made on behalf of this user
    #[serde(default)]
    pub id_token: Option<String>,

    /// Token expiration timestamp (Unix timestamp)
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            id_token: None,
            expires_at: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>, expires_at: Option<i64>) -> Self {
        self.id_token = Some(token.into());
        self.expires_at = expires_at;
        self
    }

    /// Check if the token is expired. Identities without expiry never expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }

    /// Name shown in the "Welcome, ..." banner: display name, else email, else uid.
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(&self.uid)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("uid", &self.uid)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
