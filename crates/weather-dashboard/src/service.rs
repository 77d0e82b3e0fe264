use chrono::{DateTime, Utc};

use crate::cache::{Lookup, TtlCache};
use crate::config::RuntimeConfig;
use crate::model::{Coordinates, DashboardInputs, ForecastKey, ForecastRequest, PlaceQuery};
use crate::providers::{ForecastResponse, ProviderApi, ProviderError};
use crate::view::{CacheMetadata, Fetched, Notice, PipelineOutcome, ViewModel, build_view};

/// Geocode → forecast → shape pipeline with its two result caches.
///
/// Built once by the host and reused for every input change; the caches live
/// exactly as long as this value.
#[derive(Debug)]
pub struct Dashboard<P> {
    providers: P,
    geocode_ttl_secs: u64,
    forecast_ttl_secs: u64,
    geocode_cache: TtlCache<PlaceQuery, Coordinates>,
    forecast_cache: TtlCache<ForecastKey, ForecastResponse>,
}

impl<P: ProviderApi> Dashboard<P> {
    pub fn new(config: &RuntimeConfig, providers: P) -> Self {
        Self {
            providers,
            geocode_ttl_secs: config.geocode_ttl_secs,
            forecast_ttl_secs: config.forecast_ttl_secs,
            geocode_cache: TtlCache::new(),
            forecast_cache: TtlCache::new(),
        }
    }

    pub fn providers(&self) -> &P {
        &self.providers
    }

    /// Resolves `place` to coordinates. Every failure pushes exactly one
    /// notice and yields `None`.
    pub fn resolve(
        &self,
        place: &PlaceQuery,
        now: DateTime<Utc>,
        notices: &mut Vec<Notice>,
    ) -> Option<Fetched<Coordinates>> {
        let result = self
            .geocode_cache
            .get_or_fetch(place.clone(), self.geocode_ttl_secs, now, || {
                self.providers
                    .geocode_place(place)
                    .and_then(require_finite)
            });

        match result {
            Ok((value, lookup)) => {
                log_lookup("geocode", lookup);
                Some(Fetched {
                    value,
                    freshness: CacheMetadata::from_lookup(lookup, self.geocode_ttl_secs),
                })
            }
            Err(error) => {
                tracing::warn!(query = %place.lookup_text(), %error, "geocode failed");
                notices.push(Notice::for_geocode_failure(&error));
                None
            }
        }
    }

    pub fn fetch(
        &self,
        request: &ForecastRequest,
        now: DateTime<Utc>,
        notices: &mut Vec<Notice>,
    ) -> Option<Fetched<ForecastResponse>> {
        let result = self.forecast_cache.get_or_fetch(
            request.cache_key(),
            self.forecast_ttl_secs,
            now,
            || self.providers.fetch_forecast(request),
        );

        match result {
            Ok((value, lookup)) => {
                log_lookup("forecast", lookup);
                Some(Fetched {
                    value,
                    freshness: CacheMetadata::from_lookup(lookup, self.forecast_ttl_secs),
                })
            }
            Err(error) => {
                tracing::warn!(
                    latitude = request.coordinates.latitude,
                    longitude = request.coordinates.longitude,
                    days = request.days.get(),
                    %error,
                    "forecast failed"
                );
                notices.push(Notice::for_forecast_failure(&error));
                None
            }
        }
    }

    /// Runs the whole pipeline for one snapshot of the inputs.
    pub fn render<N>(&self, inputs: &DashboardInputs, now_fn: N) -> ViewModel
    where
        N: Fn() -> DateTime<Utc>,
    {
        let mut outcome = PipelineOutcome::default();

        outcome.coordinates = self.resolve(&inputs.place, now_fn(), &mut outcome.notices);
        if let Some(coordinates) = &outcome.coordinates {
            let request = ForecastRequest::new(coordinates.value, inputs.days);
            outcome.forecast = self.fetch(&request, now_fn(), &mut outcome.notices);
        }

        let view = build_view(inputs, outcome);
        tracing::debug!(
            place = %inputs.place.lookup_text(),
            notices = view.notices.len(),
            has_errors = view.has_errors(),
            "dashboard rendered"
        );
        view
    }

    /// Drops expired entries from both caches; returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        self.geocode_cache.purge_expired(self.geocode_ttl_secs, now)
            + self.forecast_cache.purge_expired(self.forecast_ttl_secs, now)
    }
}

fn require_finite(coordinates: Coordinates) -> Result<Coordinates, ProviderError> {
    if coordinates.is_finite() {
        Ok(coordinates)
    } else {
        Err(ProviderError::InvalidResponse(format!(
            "non-finite coordinates {}",
            coordinates.label()
        )))
    }
}

fn log_lookup(stage: &'static str, lookup: Lookup) {
    match lookup {
        Lookup::Hit { age_secs } => tracing::debug!(stage, age_secs, "cache hit"),
        Lookup::Miss => tracing::debug!(stage, "cache miss, fetched live"),
    }
}
