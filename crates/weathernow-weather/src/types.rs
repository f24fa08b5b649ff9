use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://www.weatherbit.io/static/img/icons";

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Weatherbit `units` query value
    pub fn units_param(&self) -> &'static str {
        match self {
            Self::Celsius => "M",
            Self::Fahrenheit => "I",
        }
    }
}

/// Short condition summary attached to an observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub description: String,
    pub icon: String,
}

/// Current conditions for one station/city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city_name: String,
    pub country_code: String,
    pub temp: f64,
    pub weather: WeatherSummary,
    #[serde(default)]
    pub wind_spd: f64,
    #[serde(default)]
    pub rh: f64,
}

impl WeatherObservation {
    /// URL of the condition icon image
    pub fn icon_url(&self) -> String {
        icon_url(&self.weather.icon)
    }
}

/// Icon image URL for a Weatherbit icon code (e.g. `c01d`)
pub fn icon_url(icon: &str) -> String {
    format!("{}/{}.png", ICON_BASE_URL, icon)
}

/// Response body of the current-conditions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub data: Vec<WeatherObservation>,
    #[serde(default)]
    pub count: u32,
}

impl WeatherReport {
    /// The observation the app displays and saves (the first one).
    pub fn primary(&self) -> Option<&WeatherObservation> {
        self.data.first()
    }
}

/// Error body returned by the API on failure
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: Option<String>,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
    #[error("No weather data found for {0}. Please check the city name.")]
    NoData(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("City name is empty")]
    EmptyCity,
    #[error("Weather API key is not configured")]
    MissingApiKey,
}
