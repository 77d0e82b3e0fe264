use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::model::{Coordinates, ForecastRequest, PlaceQuery};

pub mod nominatim;
pub mod open_meteo;

pub use open_meteo::{DailySeries, ForecastResponse, HourlySeries};

pub trait ProviderApi {
    fn geocode_place(&self, place: &PlaceQuery) -> Result<Coordinates, ProviderError>;
    fn fetch_forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct HttpProviders {
    client: Client,
    geocode_endpoint: String,
    forecast_endpoint: String,
}

impl HttpProviders {
    pub fn new(config: &RuntimeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            geocode_endpoint: config.geocode_endpoint.clone(),
            forecast_endpoint: config.forecast_endpoint.clone(),
        })
    }
}

impl ProviderApi for HttpProviders {
    fn geocode_place(&self, place: &PlaceQuery) -> Result<Coordinates, ProviderError> {
        nominatim::search(&self.client, &self.geocode_endpoint, place).inspect_err(|error| {
            tracing::debug!(provider = nominatim::PROVIDER_NAME, %error, "provider request failed")
        })
    }

    fn fetch_forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse, ProviderError> {
        open_meteo::fetch_forecast(&self.client, &self.forecast_endpoint, request).inspect_err(
            |error| {
                tracing::debug!(provider = open_meteo::PROVIDER_NAME, %error, "provider request failed")
            },
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("location not found: {0}")]
    NotFound(String),
}

pub(crate) fn execute_request(request: RequestBuilder) -> Result<String, ProviderError> {
    let response = request
        .send()
        .map_err(|error| ProviderError::Transport(error.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|error| ProviderError::Transport(error.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    Err(ProviderError::Http {
        status: status.as_u16(),
        message: error_body_text(&body, status.canonical_reason()),
    })
}

/// The response body as the user should see it; an empty body falls back to
/// the status reason phrase.
fn error_body_text(body: &str, reason: Option<&str>) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}
