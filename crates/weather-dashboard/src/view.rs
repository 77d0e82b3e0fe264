use serde::{Deserialize, Serialize};

use crate::cache::Lookup;
use crate::model::{Coordinates, DashboardInputs, DisplayMode, Metric, PlaceQuery};
use crate::providers::{ForecastResponse, ProviderError};
use crate::shaper::{
    DisplayTable, LongRow, SummaryFigures, TIME_COLUMN, shape_table, summarize, to_long_form,
};

pub const DASHBOARD_TITLE: &str = "Weather Dashboard";
pub const DASHBOARD_SUBTITLE: &str = "Live weather forecasts.";
pub const SUMMARY_HEADING: &str = "Daily Forecast Summary";
pub const CHART_VALUE_LABEL: &str = "Value";

const LOCATION_NOT_FOUND: &str = "Location not found. Please try again.";
const FORECAST_FAILED: &str =
    "Failed to retrieve weather data for these coordinates. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Error,
    Warning,
}

/// Inline, user-visible message about a failed pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn for_geocode_failure(error: &ProviderError) -> Self {
        match error {
            ProviderError::Transport(detail) => Self::error(format!("Request failed: {detail}")),
            ProviderError::Http { status, message } => Self::error(format!(
                "API request failed with status code {status}: {message}"
            )),
            ProviderError::NotFound(_) => Self::warning(LOCATION_NOT_FOUND),
            ProviderError::InvalidResponse(detail) => {
                Self::error(format!("Unexpected response from geocoding service: {detail}"))
            }
        }
    }

    pub fn for_forecast_failure(error: &ProviderError) -> Self {
        match error {
            ProviderError::Transport(detail) => Self::error(format!("Request failed: {detail}")),
            ProviderError::InvalidResponse(detail) => {
                Self::error(format!("Unexpected response from forecast service: {detail}"))
            }
            ProviderError::Http { .. } | ProviderError::NotFound(_) => {
                Self::error(format!("{FORECAST_FAILED} ({error})"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessStatus {
    Live,
    CacheFresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub status: FreshnessStatus,
    pub ttl_secs: u64,
    pub age_secs: u64,
}

impl CacheMetadata {
    pub fn from_lookup(lookup: Lookup, ttl_secs: u64) -> Self {
        match lookup {
            Lookup::Hit { age_secs } => Self {
                status: FreshnessStatus::CacheFresh,
                ttl_secs,
                age_secs,
            },
            Lookup::Miss => Self {
                status: FreshnessStatus::Live,
                ttl_secs,
                age_secs: 0,
            },
        }
    }
}

/// A pipeline value plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub freshness: CacheMetadata,
}

/// Everything the network half of the pipeline produced for one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutcome {
    pub coordinates: Option<Fetched<Coordinates>>,
    pub forecast: Option<Fetched<ForecastResponse>>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySection {
    pub heading: String,
    #[serde(flatten)]
    pub figures: SummaryFigures,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSection {
    pub heading: String,
    #[serde(flatten)]
    pub table: DisplayTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub metric: Metric,
    pub name: String,
    pub points: Vec<ChartPoint>,
}

/// Multi-series line chart, one series per selected metric, legend keyed by
/// metric label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub markers: bool,
    pub series: Vec<ChartSeries>,
}

impl ChartSpec {
    pub fn from_long_form(title: String, rows: Vec<LongRow>) -> Self {
        let mut series: Vec<ChartSeries> = Vec::new();
        for row in rows {
            let point = ChartPoint {
                time: row.time,
                value: row.value,
            };
            match series.iter_mut().find(|item| item.metric == row.metric) {
                Some(existing) => existing.points.push(point),
                None => series.push(ChartSeries {
                    metric: row.metric,
                    name: row.metric.label().to_string(),
                    points: vec![point],
                }),
            }
        }

        Self {
            title,
            x_label: TIME_COLUMN.to_string(),
            y_label: CHART_VALUE_LABEL.to_string(),
            markers: true,
            series,
        }
    }

    pub fn legend(&self) -> Vec<&str> {
        self.series.iter().map(|item| item.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub title: String,
    pub subtitle: String,
    pub place: PlaceQuery,
    pub days: u8,
    pub metrics: Vec<Metric>,
    pub mode: DisplayMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocode_cache: Option<CacheMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_cache: Option<CacheMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummarySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    pub notices: Vec<Notice>,
}

impl ViewModel {
    fn empty(inputs: &DashboardInputs, notices: Vec<Notice>) -> Self {
        Self {
            title: DASHBOARD_TITLE.to_string(),
            subtitle: DASHBOARD_SUBTITLE.to_string(),
            place: inputs.place.clone(),
            days: inputs.days.get(),
            metrics: inputs.metrics.clone(),
            mode: inputs.mode,
            coordinates: None,
            timezone: None,
            geocode_cache: None,
            forecast_cache: None,
            summary: None,
            table: None,
            chart: None,
            notices,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.notices
            .iter()
            .any(|notice| notice.level == NoticeLevel::Error)
    }
}

/// Turns one pipeline outcome into what the host should draw. Missing
/// coordinates or a forecast without an `hourly` block stop here without an
/// extra notice.
pub fn build_view(inputs: &DashboardInputs, outcome: PipelineOutcome) -> ViewModel {
    let PipelineOutcome {
        coordinates,
        forecast,
        notices,
    } = outcome;
    let mut view = ViewModel::empty(inputs, notices);

    let Some(coordinates) = coordinates else {
        return view;
    };
    view.coordinates = Some(coordinates.value);
    view.geocode_cache = Some(coordinates.freshness);

    let Some(forecast) = forecast else {
        return view;
    };
    view.forecast_cache = Some(forecast.freshness);
    view.timezone = forecast.value.timezone.clone();

    let Some(hourly) = forecast.value.hourly.as_ref() else {
        return view;
    };

    let table = match shape_table(hourly, inputs.days, &inputs.metrics) {
        Ok(table) => table,
        Err(error) => {
            view.notices.push(Notice::error(format!(
                "Could not prepare forecast table: {error}"
            )));
            return view;
        }
    };

    view.summary = Some(SummarySection {
        heading: SUMMARY_HEADING.to_string(),
        figures: summarize(forecast.value.daily.as_ref()),
    });

    let city = &inputs.place.city;
    if inputs.mode.shows_chart() {
        let long_form = to_long_form(&table, &inputs.metrics);
        view.chart = Some(ChartSpec::from_long_form(
            format!("Hourly Weather Forecast for {city}"),
            long_form,
        ));
    }
    if inputs.mode.shows_table() {
        view.table = Some(TableSection {
            heading: format!("Hourly weather forecast for {city}"),
            table,
        });
    }

    view
}
