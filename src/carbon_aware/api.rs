//! Carbon intensity API integration
//!
//! API documentation:
//! <https://carbon-intensity.github.io/api-definitions/#get-regional-intensity-from-to-regionid-regionid>

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::carbon_aware::error::IntensityError;
use crate::carbon_aware::types::{CarbonIntensityConfig, QueryWindow};
use crate::error::{Error, Result};

/// Source of regional forecast intensities
#[async_trait]
pub trait IntensityProvider: Send + Sync {
    /// Forecast intensity (gCO2e/kWh) for the configured region over `window`
    async fn forecast(&self, window: QueryWindow) -> std::result::Result<f64, IntensityError>;
}

/// Regional intensity response: `{"data": {"data": [{"intensity": {"forecast": N}}]}}`
#[derive(Debug, Deserialize)]
struct RegionalResponse {
    data: RegionalData,
}

#[derive(Debug, Deserialize)]
struct RegionalData {
    data: Vec<IntensityPeriod>,
}

#[derive(Debug, Deserialize)]
struct IntensityPeriod {
    intensity: IntensityValues,
}

#[derive(Debug, Deserialize)]
struct IntensityValues {
    forecast: f64,
}

/// HTTP client for the regional carbon intensity API
#[derive(Clone)]
pub struct CarbonIntensityApi {
    client: Client,
    base_url: String,
    region_id: u32,
}

impl CarbonIntensityApi {
    /// Create a client bounded by the configured timeout
    pub fn new(config: &CarbonIntensityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            region_id: config.region_id,
        })
    }

    /// Request URL for a window
    pub fn window_url(&self, window: &QueryWindow) -> String {
        let (from, to) = window.api_bounds();
        format!(
            "{}/regional/intensity/{}/{}/regionid/{}",
            self.base_url, from, to, self.region_id
        )
    }
}

/// Pull the first forecast value out of a regional response body
pub fn parse_forecast(body: &str) -> std::result::Result<f64, IntensityError> {
    let response: RegionalResponse = serde_json::from_str(body)?;

    let first = response.data.data.first().ok_or_else(|| {
        IntensityError::ProviderResponseFormat("forecast list is empty".to_string())
    })?;

    let forecast = first.intensity.forecast;
    if !forecast.is_finite() || forecast < 0.0 {
        return Err(IntensityError::ProviderResponseFormat(format!(
            "forecast {forecast} is not a non-negative intensity"
        )));
    }

    Ok(forecast)
}

#[async_trait]
impl IntensityProvider for CarbonIntensityApi {
    async fn forecast(&self, window: QueryWindow) -> std::result::Result<f64, IntensityError> {
        let url = self.window_url(&window);
        debug!("Querying carbon intensity from {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_forecast(&body)
    }
}
