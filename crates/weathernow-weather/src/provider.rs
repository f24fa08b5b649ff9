use crate::types::{ErrorPayload, TemperatureUnit, WeatherError, WeatherReport};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub const WEATHERBIT_API_URL: &str = "https://api.weatherbit.io/v2.0";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Anything that can answer "what is the weather in this city right now".
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherbitProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    unit: TemperatureUnit,
}

impl WeatherbitProvider {
    pub fn new(api_key: impl Into<String>, unit: TemperatureUnit) -> Result<Self, WeatherError> {
        Self::with_options(
            WEATHERBIT_API_URL,
            api_key,
            unit,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_options(
        base_url: &str,
        api_key: impl Into<String>,
        unit: TemperatureUnit,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            unit,
        })
    }

    /// Turn a failed response into the most specific message available:
    /// the API's own `error` field, else the bare status.
    async fn error_from_response(response: reqwest::Response) -> WeatherError {
        let status = response.status();
        let fallback = format!("HTTP error! Status: {}", status.as_u16());

        match response.json::<ErrorPayload>().await {
            Ok(ErrorPayload { error: Some(msg) }) if !msg.is_empty() => WeatherError::Api(msg),
            _ => WeatherError::Api(fallback),
        }
    }
}

#[async_trait]
impl WeatherSource for WeatherbitProvider {
    #[instrument(skip(self), level = "info")]
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyCity);
        }
        if self.api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let url = format!("{}/current", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("city", city),
                ("key", self.api_key.as_str()),
                ("units", self.unit.units_param()),
            ])
            .send()
            .await?;

        // Weatherbit answers unknown cities with 204 and an empty body
        if response.status() == StatusCode::NO_CONTENT {
            return Err(WeatherError::NoData(city.to_string()));
        }

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            tracing::warn!("Weather lookup for {} failed: {}", city, err);
            return Err(err);
        }

        let report: WeatherReport = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        if report.data.is_empty() {
            return Err(WeatherError::NoData(city.to_string()));
        }

        tracing::info!("Fetched current weather for {}", city);
        Ok(report)
    }
}
