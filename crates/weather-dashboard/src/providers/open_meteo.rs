use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::model::{ForecastRequest, Metric};

use super::{ProviderError, execute_request};

pub const PROVIDER_NAME: &str = "open_meteo";
const FORECAST_DAILY_FIELDS: &str = "precipitation_sum,temperature_2m_min,temperature_2m_max";

#[derive(Debug, Serialize)]
struct ForecastQuery<'a> {
    latitude: f64,
    longitude: f64,
    hourly: String,
    daily: &'a str,
    timezone: &'a str,
    forecast_days: u8,
}

/// Decoded forecast payload. Either series may be absent when the upstream
/// omits it; samples are `None` where the API reports `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub utc_offset_seconds: Option<i32>,
    #[serde(default)]
    pub hourly: Option<HourlySeries>,
    #[serde(default)]
    pub daily: Option<DailySeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default, alias = "relative_humidity_2m")]
    pub relativehumidity_2m: Vec<Option<f64>>,
    #[serde(default, alias = "wind_speed_10m")]
    pub windspeed_10m: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
}

pub fn fetch_forecast(
    client: &Client,
    endpoint: &str,
    request: &ForecastRequest,
) -> Result<ForecastResponse, ProviderError> {
    let query = ForecastQuery {
        latitude: request.coordinates.latitude,
        longitude: request.coordinates.longitude,
        hourly: hourly_fields(),
        daily: FORECAST_DAILY_FIELDS,
        timezone: "auto",
        forecast_days: request.days.get(),
    };

    tracing::debug!(
        latitude = query.latitude,
        longitude = query.longitude,
        days = query.forecast_days,
        "forecast request"
    );
    let body = execute_request(client.get(endpoint).query(&query))?;
    parse_forecast_response(&body)
}

/// Every metric is requested regardless of the selection so one cached
/// response serves any metric subset.
fn hourly_fields() -> String {
    Metric::ALL
        .iter()
        .map(|metric| metric.hourly_field())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_forecast_response(body: &str) -> Result<ForecastResponse, ProviderError> {
    serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("forecast payload: {error}")))
}
