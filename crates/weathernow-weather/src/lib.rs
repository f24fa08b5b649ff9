//! Weather service for Weather Now
//!
//! Looks up current conditions for a city via the Weatherbit API.

pub mod provider;
pub mod types;

pub use provider::{WeatherSource, WeatherbitProvider, WEATHERBIT_API_URL};
pub use types::*;
