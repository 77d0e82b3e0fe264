use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

use crate::model::{ForecastDays, Metric};
use crate::providers::{DailySeries, HourlySeries};

pub const TIME_COLUMN: &str = "Time";
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const NAIVE_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Wide table: one row per hourly timestamp, one column per selected metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTable {
    pub header: Vec<String>,
    pub columns: Vec<Metric>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub time: String,
    /// Aligned index-for-index with [`DisplayTable::columns`].
    pub values: Vec<Option<f64>>,
}

impl DisplayTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Long-form row used for multi-series charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub time: String,
    pub metric: Metric,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryFigures {
    pub min_temperature_c: Option<f64>,
    pub max_temperature_c: Option<f64>,
    pub precipitation_sum_mm: Option<f64>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("unrecognized timestamp '{0}'")]
    InvalidTimestamp(String),
}

pub fn shape_table(
    hourly: &HourlySeries,
    days: ForecastDays,
    metrics: &[Metric],
) -> Result<DisplayTable, ShapeError> {
    let row_count = days.hour_count().min(hourly.time.len());
    let columns: Vec<Metric> = Metric::ALL
        .into_iter()
        .filter(|metric| metrics.contains(metric))
        .collect();
    let series: Vec<&[Option<f64>]> = columns
        .iter()
        .map(|metric| hourly_values(hourly, *metric))
        .collect();

    let rows = hourly.time[..row_count]
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            Ok(TableRow {
                time: format_timestamp(raw)?,
                values: series
                    .iter()
                    .map(|values| values.get(index).copied().flatten())
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>, ShapeError>>()?;

    let header = std::iter::once(TIME_COLUMN.to_string())
        .chain(columns.iter().map(|metric| metric.label().to_string()))
        .collect();

    Ok(DisplayTable {
        header,
        columns,
        rows,
    })
}

pub fn hourly_values(hourly: &HourlySeries, metric: Metric) -> &[Option<f64>] {
    match metric {
        Metric::Temperature => &hourly.temperature_2m,
        Metric::Humidity => &hourly.relativehumidity_2m,
        Metric::WindSpeed => &hourly.windspeed_10m,
    }
}

/// Day-0 headline figures. Missing series or samples stay `None`.
pub fn summarize(daily: Option<&DailySeries>) -> SummaryFigures {
    let Some(daily) = daily else {
        return SummaryFigures::default();
    };

    SummaryFigures {
        min_temperature_c: first_sample(&daily.temperature_2m_min),
        max_temperature_c: first_sample(&daily.temperature_2m_max),
        precipitation_sum_mm: first_sample(&daily.precipitation_sum),
    }
}

fn first_sample(values: &[Option<f64>]) -> Option<f64> {
    values.first().copied().flatten()
}

pub fn format_timestamp(raw: &str) -> Result<String, ShapeError> {
    let trimmed = raw.trim();

    let parsed = NAIVE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|value| value.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| ShapeError::InvalidTimestamp(raw.to_string()))?;

    Ok(parsed.format(DISPLAY_TIME_FORMAT).to_string())
}

/// Wide to long reshape. Series follow `metrics` order; metrics absent from
/// the table are skipped.
pub fn to_long_form(table: &DisplayTable, metrics: &[Metric]) -> Vec<LongRow> {
    let mut out = Vec::with_capacity(table.row_count() * metrics.len());
    for metric in metrics {
        let Some(index) = table.columns.iter().position(|column| column == metric) else {
            continue;
        };
        out.extend(table.rows.iter().map(|row| LongRow {
            time: row.time.clone(),
            metric: *metric,
            value: row.values[index],
        }));
    }
    out
}
