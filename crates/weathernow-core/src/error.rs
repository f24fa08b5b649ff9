//! Top-level error type for Weather Now.
//!
//! Every crate keeps its own error enum; `AppError` wraps them and maps each
//! to a message suitable for showing next to the control that failed.

use thiserror::Error;
use weathernow_auth::AuthError;
use weathernow_store::StoreError;
use weathernow_sync::{SyncError, LOAD_ERROR_MESSAGE};
use weathernow_weather::WeatherError;

/// Top-level application error type.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// An anonymous user tried to change their snapshots.
    #[error("Sign-in required to {action} snapshots")]
    SignInRequired { action: &'static str },

    /// The store rejected a save, delete or note edit.
    #[error("Failed to {action} snapshot: {source}")]
    WriteFailed {
        action: &'static str,
        #[source]
        source: StoreError,
    },

    /// Save was requested without a weather result to save.
    #[error("Weather data is missing")]
    MissingWeatherData,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Weather(e) => weather_message(e),
            AppError::Store(e) => store_message(e).to_string(),
            AppError::Auth(e) => auth_message(e).to_string(),
            AppError::Sync(e) => sync_message(e),
            AppError::SignInRequired { action } => {
                format!("Please sign in to {} snapshots.", action)
            }
            AppError::WriteFailed { action, source } => {
                format!("Failed to {} snapshot: {}", action, store_message(source))
            }
            AppError::MissingWeatherData => {
                "Cannot save snapshot: Weather data is missing.".to_string()
            }
            AppError::Io(_) => "A file operation failed. Please try again.".to_string(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}

fn weather_message(e: &WeatherError) -> String {
    match e {
        // The API's own wording (or the bare status) is what the search form shows
        WeatherError::Api(_) | WeatherError::NoData(_) => e.to_string(),
        WeatherError::Network(_) => {
            "Unable to reach the weather service. Check your internet connection.".to_string()
        }
        WeatherError::Parse(_) => {
            "Received an unexpected response from the weather service.".to_string()
        }
        WeatherError::EmptyCity => "Please enter a city name.".to_string(),
        WeatherError::MissingApiKey => {
            "Weather API key is not configured. Check settings.".to_string()
        }
    }
}

fn store_message(e: &StoreError) -> &'static str {
    match e {
        StoreError::Unauthenticated => "Your session has expired. Please sign in again.",
        StoreError::PermissionDenied(_) => "You don't have permission to access these snapshots.",
        StoreError::NotFound(_) => "That snapshot no longer exists.",
        e if e.is_transient() => "The snapshot service is unavailable. Please try again later.",
        _ => "A data operation failed. Please try again.",
    }
}

fn auth_message(e: &AuthError) -> &'static str {
    match e {
        AuthError::SignInFailed(_) => "Sign-in failed. Please try again.",
        AuthError::Cancelled => "Sign-in was cancelled.",
        AuthError::Storage(_) => "Failed to save your session. Please try again.",
    }
}

fn sync_message(e: &SyncError) -> String {
    match e {
        SyncError::Unauthenticated => {
            "Please sign in to view and manage saved snapshots.".to_string()
        }
        SyncError::RemoteRead(_) => LOAD_ERROR_MESSAGE.to_string(),
        SyncError::RemoteWrite(inner) => {
            format!("Failed to update saved snapshots: {}", store_message(inner))
        }
        SyncError::Closed => "The app is shutting down.".to_string(),
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}
