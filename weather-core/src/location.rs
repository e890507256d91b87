//! Device position sources.

use std::{fmt::Debug, sync::Mutex, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::Coordinate;

const USER_AGENT: &str = concat!("weather-cli/", env!("CARGO_PKG_VERSION"));

/// Best-effort position provider, gated by permission and positioning
/// availability.
#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    async fn permission_granted(&self) -> bool;

    async fn positioning_enabled(&self) -> bool;

    /// Cached position, if the source has one. Never triggers a new fix.
    async fn last_known(&self) -> Option<Coordinate>;

    /// One fresh, non-continuous position request.
    async fn request_single_fix(&self) -> Option<Coordinate>;
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(alias = "lat")]
    latitude: Option<f64>,
    #[serde(alias = "lon")]
    longitude: Option<f64>,
}

/// Resolves the position from the public IP address.
///
/// Permission maps to the user's recorded consent, positioning to the
/// `location.enabled` switch. The last fix is cached for the lifetime of the
/// source and served by [`LocationSource::last_known`].
#[derive(Debug)]
pub struct IpLocationSource {
    http: Client,
    lookup_url: String,
    consent: bool,
    enabled: bool,
    last: Mutex<Option<Coordinate>>,
}

impl IpLocationSource {
    pub fn new(
        lookup_url: impl Into<String>,
        consent: bool,
        enabled: bool,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            lookup_url: lookup_url.into(),
            consent,
            enabled,
            last: Mutex::new(None),
        })
    }

    async fn lookup(&self) -> Option<Coordinate> {
        let response = match self.http.get(&self.lookup_url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("IP location request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("IP location lookup returned status {}", response.status());
            return None;
        }

        let body: IpLookupResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("IP location parse error: {}", e);
                return None;
            }
        };

        let coordinate = Coordinate::new(body.latitude?, body.longitude?);
        if !coordinate.is_valid() {
            tracing::warn!(%coordinate, "IP location lookup returned an out-of-range position");
            return None;
        }

        Some(coordinate)
    }
}

#[async_trait]
impl LocationSource for IpLocationSource {
    async fn permission_granted(&self) -> bool {
        self.consent
    }

    async fn positioning_enabled(&self) -> bool {
        self.enabled
    }

    async fn last_known(&self) -> Option<Coordinate> {
        *self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn request_single_fix(&self) -> Option<Coordinate> {
        let fix = self.lookup().await?;
        tracing::info!(%fix, "resolved position from IP address");
        *self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(fix);
        Some(fix)
    }
}
