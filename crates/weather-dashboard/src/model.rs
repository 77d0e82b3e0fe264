use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_FORECAST_DAYS: u8 = 1;
pub const MAX_FORECAST_DAYS: u8 = 7;
pub const HOURS_PER_DAY: usize = 24;

pub const DEFAULT_CITY: &str = "London";
pub const DEFAULT_COUNTRY: &str = "UK";
pub const DEFAULT_FORECAST_DAYS: u8 = 2;

/// Free-text place lookup. Used verbatim as the geocoding cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceQuery {
    pub city: String,
    pub country: String,
}

impl PlaceQuery {
    pub fn new(city: &str, country: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            city: normalize_required(city, ValidationError::EmptyCity)?,
            country: normalize_required(country, ValidationError::EmptyCountry)?,
        })
    }

    pub fn lookup_text(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    pub fn label(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ForecastDays(u8);

impl ForecastDays {
    pub fn new(days: u8) -> Result<Self, ValidationError> {
        if (MIN_FORECAST_DAYS..=MAX_FORECAST_DAYS).contains(&days) {
            Ok(Self(days))
        } else {
            Err(ValidationError::InvalidDays(days))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn hour_count(self) -> usize {
        HOURS_PER_DAY * usize::from(self.0)
    }
}

impl Default for ForecastDays {
    fn default() -> Self {
        Self(DEFAULT_FORECAST_DAYS)
    }
}

impl TryFrom<u8> for ForecastDays {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ForecastDays> for u8 {
    fn from(value: ForecastDays) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub coordinates: Coordinates,
    pub days: ForecastDays,
}

/// Exact-argument key for the forecast cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForecastKey {
    latitude: OrderedFloat<f64>,
    longitude: OrderedFloat<f64>,
    days: ForecastDays,
}

impl ForecastRequest {
    pub fn new(coordinates: Coordinates, days: ForecastDays) -> Self {
        Self { coordinates, days }
    }

    pub fn cache_key(&self) -> ForecastKey {
        ForecastKey {
            latitude: OrderedFloat(self.coordinates.latitude),
            longitude: OrderedFloat(self.coordinates.longitude),
            days: self.days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
    WindSpeed,
}

impl Metric {
    /// Canonical column order of the display table.
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::WindSpeed];

    pub fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature (°C)",
            Self::Humidity => "Humidity (%)",
            Self::WindSpeed => "Wind Speed (km/h)",
        }
    }

    pub fn hourly_field(self) -> &'static str {
        match self {
            Self::Temperature => "temperature_2m",
            Self::Humidity => "relativehumidity_2m",
            Self::WindSpeed => "windspeed_10m",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Graph,
    Table,
    Both,
}

impl DisplayMode {
    pub fn shows_table(self) -> bool {
        matches!(self, Self::Table | Self::Both)
    }

    pub fn shows_chart(self) -> bool {
        matches!(self, Self::Graph | Self::Both)
    }
}

/// One snapshot of the dashboard controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardInputs {
    pub place: PlaceQuery,
    pub days: ForecastDays,
    pub metrics: Vec<Metric>,
    pub mode: DisplayMode,
}

impl DashboardInputs {
    pub fn new(
        city: &str,
        country: &str,
        days: u8,
        metrics: &[Metric],
        mode: DisplayMode,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            place: PlaceQuery::new(city, country)?,
            days: ForecastDays::new(days)?,
            metrics: dedupe_metrics(metrics),
            mode,
        })
    }
}

impl Default for DashboardInputs {
    fn default() -> Self {
        Self {
            place: PlaceQuery {
                city: DEFAULT_CITY.to_string(),
                country: DEFAULT_COUNTRY.to_string(),
            },
            days: ForecastDays::default(),
            metrics: vec![Metric::Temperature],
            mode: DisplayMode::default(),
        }
    }
}

/// Wire form of [`DashboardInputs`]; every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawDashboardInputs {
    pub city: Option<String>,
    pub country: Option<String>,
    pub days: Option<u8>,
    pub metrics: Option<Vec<Metric>>,
    pub mode: Option<DisplayMode>,
}

impl RawDashboardInputs {
    pub fn validate(self) -> Result<DashboardInputs, ValidationError> {
        let metrics = self.metrics.unwrap_or_else(|| vec![Metric::Temperature]);
        DashboardInputs::new(
            self.city.as_deref().unwrap_or(DEFAULT_CITY),
            self.country.as_deref().unwrap_or(DEFAULT_COUNTRY),
            self.days.unwrap_or(DEFAULT_FORECAST_DAYS),
            &metrics,
            self.mode.unwrap_or_default(),
        )
    }
}

pub fn dedupe_metrics(metrics: &[Metric]) -> Vec<Metric> {
    let mut out = Vec::with_capacity(metrics.len());
    for metric in metrics {
        if !out.contains(metric) {
            out.push(*metric);
        }
    }
    out
}

fn normalize_required(raw: &str, empty: ValidationError) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(empty);
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("city must not be empty")]
    EmptyCity,
    #[error("country must not be empty")]
    EmptyCountry,
    #[error("days must be between {MIN_FORECAST_DAYS} and {MAX_FORECAST_DAYS} (got {0})")]
    InvalidDays(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_place_query_trims_and_formats_lookup_text() {
        let place = PlaceQuery::new("  London ", " UK").expect("place");
        assert_eq!(place.city, "London");
        assert_eq!(place.lookup_text(), "London, UK");
    }

    #[test]
    fn model_place_query_requires_city_and_country() {
        assert_eq!(
            PlaceQuery::new("   ", "UK").expect_err("must fail"),
            ValidationError::EmptyCity
        );
        assert_eq!(
            PlaceQuery::new("London", "").expect_err("must fail"),
            ValidationError::EmptyCountry
        );
    }

    #[test]
    fn model_forecast_days_bounds_are_inclusive() {
        assert!(ForecastDays::new(1).is_ok());
        assert!(ForecastDays::new(7).is_ok());
        assert_eq!(
            ForecastDays::new(0).expect_err("must fail"),
            ValidationError::InvalidDays(0)
        );
        assert_eq!(
            ForecastDays::new(8).expect_err("must fail"),
            ValidationError::InvalidDays(8)
        );
        assert_eq!(ForecastDays::new(3).expect("days").hour_count(), 72);
    }

    #[test]
    fn model_forecast_key_matches_exact_arguments() {
        let days = ForecastDays::new(2).expect("days");
        let london = Coordinates {
            latitude: 51.5,
            longitude: -0.12,
        };
        let a = ForecastRequest::new(london, days).cache_key();
        let b = ForecastRequest::new(london, days).cache_key();
        let c = ForecastRequest::new(london, ForecastDays::new(3).expect("days")).cache_key();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn model_inputs_dedupe_metrics_keeping_first_occurrence() {
        let inputs = DashboardInputs::new(
            "London",
            "UK",
            2,
            &[Metric::WindSpeed, Metric::Temperature, Metric::WindSpeed],
            DisplayMode::Both,
        )
        .expect("inputs");

        assert_eq!(inputs.metrics, vec![Metric::WindSpeed, Metric::Temperature]);
    }

    #[test]
    fn model_raw_inputs_fall_back_to_defaults() {
        let raw: RawDashboardInputs = serde_json::from_str("{}").expect("json");
        assert_eq!(raw.validate().expect("inputs"), DashboardInputs::default());
    }

    #[test]
    fn model_raw_inputs_parse_snake_case_values() {
        let raw: RawDashboardInputs = serde_json::from_str(
            r#"{"city":"Paris","country":"France","days":5,"metrics":["humidity","wind_speed"],"mode":"both"}"#,
        )
        .expect("json");
        let inputs = raw.validate().expect("inputs");

        assert_eq!(inputs.place.lookup_text(), "Paris, France");
        assert_eq!(inputs.days.get(), 5);
        assert_eq!(inputs.metrics, vec![Metric::Humidity, Metric::WindSpeed]);
        assert_eq!(inputs.mode, DisplayMode::Both);
    }

    #[test]
    fn model_raw_inputs_reject_out_of_range_days() {
        let raw: RawDashboardInputs = serde_json::from_str(r#"{"days":9}"#).expect("json");
        assert_eq!(
            raw.validate().expect_err("must fail"),
            ValidationError::InvalidDays(9)
        );
    }
}
