use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::FetchFailure,
    model::{Coordinate, WeatherCondition, WeatherSample, WeatherSnapshot},
};

use super::WeatherFetcher;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

const HOURLY_FIELDS: &str = concat!(
    "temperature_2m,weathercode,relativehumidity_2m,",
    "windspeed_10m,pressure_msl,precipitation_probability"
);

#[derive(Debug, Clone)]
pub struct OpenMeteoFetcher {
    base_url: String,
    http: Client,
}

impl OpenMeteoFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_hourly(&self, coordinate: Coordinate) -> Result<OmHourly, FetchFailure> {
        let url = format!("{}/v1/forecast", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchFailure::new("timeout")
                } else {
                    FetchFailure::new(format!("Failed to send request to Open-Meteo: {e}"))
                }
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            FetchFailure::new(format!("Failed to read Open-Meteo response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(FetchFailure::new(format!(
                "Open-Meteo request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OmResponse = serde_json::from_str(&body)
            .map_err(|e| FetchFailure::new(format!("Failed to parse Open-Meteo JSON: {e}")))?;

        Ok(parsed.hourly)
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    hourly: OmHourly,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    #[serde(rename = "temperature_2m")]
    temperatures: Vec<f64>,
    #[serde(rename = "weathercode")]
    weather_codes: Vec<i32>,
    #[serde(rename = "pressure_msl")]
    pressures: Vec<f64>,
    #[serde(rename = "windspeed_10m")]
    wind_speeds: Vec<f64>,
    #[serde(rename = "relativehumidity_2m")]
    humidities: Vec<f64>,
    #[serde(rename = "precipitation_probability", default)]
    precipitation_probabilities: Vec<Option<f64>>,
}

impl OmHourly {
    fn into_samples(self) -> Result<Vec<WeatherSample>, FetchFailure> {
        let len = [
            self.time.len(),
            self.temperatures.len(),
            self.weather_codes.len(),
            self.pressures.len(),
            self.wind_speeds.len(),
            self.humidities.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0);

        if len < self.time.len() {
            tracing::warn!(
                expected = self.time.len(),
                usable = len,
                "Open-Meteo hourly series have mismatched lengths; truncating"
            );
        }

        (0..len)
            .map(|i| {
                let time = NaiveDateTime::parse_from_str(&self.time[i], "%Y-%m-%dT%H:%M")
                    .map_err(|e| {
                        FetchFailure::new(format!(
                            "Failed to parse Open-Meteo timestamp '{}': {e}",
                            self.time[i]
                        ))
                    })?;
                let weather_code = self.weather_codes[i];

                Ok(WeatherSample {
                    time,
                    temperature_celsius: self.temperatures[i],
                    pressure_hpa: self.pressures[i],
                    wind_speed_kmh: self.wind_speeds[i],
                    humidity_pct: self.humidities[i],
                    precipitation_probability_pct: self
                        .precipitation_probabilities
                        .get(i)
                        .copied()
                        .flatten(),
                    weather_code,
                    condition: WeatherCondition::from_wmo_code(weather_code),
                })
            })
            .collect()
    }
}

#[async_trait]
impl WeatherFetcher for OpenMeteoFetcher {
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, FetchFailure> {
        tracing::debug!(%coordinate, "fetching hourly forecast from Open-Meteo");

        let samples = self.fetch_hourly(coordinate).await?.into_samples()?;

        // Open-Meteo answers in GMT unless asked otherwise.
        let now = chrono::Utc::now().naive_utc();

        Ok(WeatherSnapshot::from_hourly(samples, now))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
