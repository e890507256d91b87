//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - The weather coordinator that turns a location into published UI state
//! - Abstractions over the location source, coordinate store and weather fetcher
//! - Configuration and shared domain models
//!
//! It is used by `weather-cli`, but any front end can drive the coordinator
//! and subscribe to its state.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod store;

pub use config::Config;
pub use coordinator::{LoadOutcome, RemedialAction, WeatherCoordinator};
pub use error::{CoordinatorError, FetchFailure, StoreError};
pub use location::{IpLocationSource, LocationSource};
pub use model::{Coordinate, Phase, UiState, WeatherCondition, WeatherSample, WeatherSnapshot};
pub use provider::{WeatherFetcher, open_meteo::OpenMeteoFetcher};
pub use store::{CoordinateStore, FileCoordinateStore, MemoryCoordinateStore};

/// Wires the coordinator from configuration: IP-based location, file-backed
/// coordinate store and Open-Meteo.
pub fn coordinator_from_config(config: &Config) -> anyhow::Result<WeatherCoordinator> {
    let location = config.location_source()?;
    let store = config.coordinate_store()?;
    let fetcher = provider::fetcher_from_config(config)?;

    Ok(WeatherCoordinator::with_timeouts(
        std::sync::Arc::new(location),
        std::sync::Arc::new(store),
        std::sync::Arc::from(fetcher),
        config.location_timeout(),
        config.fetch_timeout(),
    ))
}
