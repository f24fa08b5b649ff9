use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use weathernow_auth::{
    Identity, IdentityProvider, LocalIdentityProvider, SessionStorage, SignInFlow,
};
use weathernow_store::{DocumentStore, HttpDocumentStore, MemoryDocumentStore};
use weathernow_sync::{NewSnapshot, SessionView, Snapshot, SnapshotPatch, SyncError, Synchronizer};
use weathernow_weather::{WeatherReport, WeatherSource, WeatherbitProvider};

use crate::config::{Config, StoreBackend};
use crate::error::{AppError, ConfigError};

/// Application root: wires the weather source, identity provider and
/// snapshot synchronizer together and exposes what the UI needs.
pub struct App {
    config: Arc<Config>,
    weather: Arc<dyn WeatherSource>,
    identity: Arc<dyn IdentityProvider>,
    sync: Synchronizer,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// Assemble an app from already-built collaborators
    pub fn new(
        config: Config,
        weather: Arc<dyn WeatherSource>,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            weather,
            identity,
            sync: Synchronizer::new(store),
            cancel: CancellationToken::new(),
            listener: Mutex::new(None),
        }
    }

    /// Build every collaborator from configuration.
    ///
    /// Resolves the initial sign-in state (restoring a persisted session
    /// when enabled) before returning.
    pub fn from_config(config: Config, sign_in: Arc<dyn SignInFlow>) -> Result<Self, AppError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        let weather = WeatherbitProvider::with_options(
            &config.weather.api_url,
            config.weather.resolved_api_key().unwrap_or_default(),
            config.weather.temperature_unit,
            Duration::from_secs(config.weather.timeout_secs),
        )?;

        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryDocumentStore::new()),
            StoreBackend::Http => Arc::new(HttpDocumentStore::with_timeout(
                &config.store.base_url,
                Duration::from_secs(config.store.timeout_secs),
            )?),
        };

        let mut identity = LocalIdentityProvider::new(sign_in);
        if config.auth.persist_session {
            identity = identity.with_storage(SessionStorage::default_location()?);
        }
        identity.resolve();

        Ok(Self::new(config, Arc::new(weather), Arc::new(identity), store))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    /// Current sync session (signed-in user, snapshots, load state)
    pub fn session(&self) -> SessionView {
        self.sync.view()
    }

    /// Start reacting to identity transitions.
    ///
    /// The current provider state is handled right away, so a provider that
    /// has already resolved its startup state triggers the first load. A
    /// transition that arrives while a load is in flight abandons that load.
    /// Calling `start` twice has no effect.
    pub fn start(&self) {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return;
        }

        let mut rx = self.identity.subscribe();
        let sync = self.sync.clone();
        let cancel = self.cancel.clone();

        *listener = Some(tokio::spawn(async move {
            tracing::info!("Identity listener started");
            loop {
                let state = rx.borrow_and_update().clone();

                if state.is_resolved() {
                    let load = sync.on_identity_change(state.identity().cloned());
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = load => {}
                        changed = rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            continue;
                        }
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Identity listener stopped");
        }));
    }

    /// Look up current weather for a city
    pub async fn search(&self, city: &str) -> Result<WeatherReport, AppError> {
        self.weather.current(city).await.map_err(|e| {
            tracing::error!("Error fetching weather data: {}", e);
            AppError::from(e)
        })
    }

    /// Save the first observation of a search result as a new snapshot.
    ///
    /// # Errors
    /// `SignInRequired` for anonymous users and `MissingWeatherData` for an
    /// empty report, both checked before anything is sent.
    pub async fn save_report(&self, report: &WeatherReport) -> Result<Snapshot, AppError> {
        if self.identity.current().is_none() {
            return Err(AppError::SignInRequired { action: "save" });
        }

        let Some(observation) = report.primary() else {
            tracing::error!("Cannot save snapshot: Weather data is missing or invalid.");
            return Err(AppError::MissingWeatherData);
        };

        let fields = NewSnapshot {
            city: observation.city_name.clone(),
            country: observation.country_code.clone(),
            temp: observation.temp,
            description: observation.weather.description.clone(),
            icon: observation.weather.icon.clone(),
        };

        self.sync
            .create(fields)
            .await
            .map_err(|e| snapshot_error(e, "save"))
    }

    pub async fn delete_snapshot(&self, id: &str) -> Result<(), AppError> {
        self.sync
            .remove(id)
            .await
            .map_err(|e| snapshot_error(e, "delete"))
    }

    pub async fn update_note(&self, id: &str, note: &str) -> Result<(), AppError> {
        self.sync
            .edit(id, SnapshotPatch::note(note))
            .await
            .map_err(|e| snapshot_error(e, "edit"))
    }

    /// Retry loading the signed-in user's snapshots
    pub async fn reload(&self) -> Result<(), AppError> {
        Ok(self.sync.reload().await?)
    }

    pub async fn sign_in(&self) -> Result<Identity, AppError> {
        Ok(self.identity.sign_in().await?)
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        Ok(self.identity.sign_out().await?)
    }

    /// Stop the identity listener and the synchronizer
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down application");

        self.cancel.cancel();
        self.sync.shutdown();

        let handle = self.listener.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Identity listener ended abnormally: {}", e);
            }
        }
    }
}

/// Attach the attempted action to a failed mutation.
fn snapshot_error(e: SyncError, action: &'static str) -> AppError {
    match e {
        SyncError::Unauthenticated => AppError::SignInRequired { action },
        SyncError::RemoteWrite(source) => AppError::WriteFailed { action, source },
        other => other.into(),
    }
}
