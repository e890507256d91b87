use crate::{
    Config, Coordinate, WeatherSnapshot, error::FetchFailure,
    provider::open_meteo::OpenMeteoFetcher,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

/// Remote weather source. One request per call, no internal retry.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, FetchFailure>;
}

/// Construct the configured fetcher.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherFetcher>> {
    let fetcher = OpenMeteoFetcher::new(config.api.base_url.clone(), config.fetch_timeout())
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client for Open-Meteo: {e}"))?;

    Ok(Box::new(fetcher))
}
