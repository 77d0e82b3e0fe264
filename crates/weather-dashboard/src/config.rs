use std::collections::HashMap;

pub const GEOCODE_CACHE_TTL_SECS: u64 = 60 * 60;
pub const FORECAST_CACHE_TTL_SECS: u64 = 10 * 60;
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

pub const NOMINATIM_SEARCH_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const OPEN_METEO_FORECAST_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "nils-weather-dashboard/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/sympoies/nils-alfredworkflow)"
);

pub const WEATHER_GEOCODE_TTL_SECS_ENV: &str = "WEATHER_GEOCODE_TTL_SECS";
pub const WEATHER_FORECAST_TTL_SECS_ENV: &str = "WEATHER_FORECAST_TTL_SECS";
pub const WEATHER_HTTP_TIMEOUT_SECS_ENV: &str = "WEATHER_HTTP_TIMEOUT_SECS";
pub const WEATHER_USER_AGENT_ENV: &str = "WEATHER_USER_AGENT";
pub const WEATHER_GEOCODE_ENDPOINT_ENV: &str = "WEATHER_GEOCODE_ENDPOINT";
pub const WEATHER_FORECAST_ENDPOINT_ENV: &str = "WEATHER_FORECAST_ENDPOINT";
pub const WEATHER_DASHBOARD_LOG_ENV: &str = "WEATHER_DASHBOARD_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub geocode_ttl_secs: u64,
    pub forecast_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub geocode_endpoint: String,
    pub forecast_endpoint: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_pairs(Vec::<(String, String)>::new())
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub(crate) fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            geocode_ttl_secs: resolve_secs(&map, WEATHER_GEOCODE_TTL_SECS_ENV, GEOCODE_CACHE_TTL_SECS),
            forecast_ttl_secs: resolve_secs(
                &map,
                WEATHER_FORECAST_TTL_SECS_ENV,
                FORECAST_CACHE_TTL_SECS,
            ),
            http_timeout_secs: resolve_secs(&map, WEATHER_HTTP_TIMEOUT_SECS_ENV, PROVIDER_TIMEOUT_SECS),
            user_agent: resolve_text(&map, WEATHER_USER_AGENT_ENV, DEFAULT_USER_AGENT),
            geocode_endpoint: resolve_text(
                &map,
                WEATHER_GEOCODE_ENDPOINT_ENV,
                NOMINATIM_SEARCH_ENDPOINT,
            ),
            forecast_endpoint: resolve_text(
                &map,
                WEATHER_FORECAST_ENDPOINT_ENV,
                OPEN_METEO_FORECAST_ENDPOINT,
            ),
        }
    }
}

fn non_empty<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn resolve_secs(env_map: &HashMap<String, String>, key: &str, default: u64) -> u64 {
    non_empty(env_map, key)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn resolve_text(env_map: &HashMap<String, String>, key: &str, default: &str) -> String {
    non_empty(env_map, key).unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_cache_windows() {
        let config = RuntimeConfig::default();
        assert_eq!(config.geocode_ttl_secs, 3600);
        assert_eq!(config.forecast_ttl_secs, 600);
        assert_eq!(config.http_timeout_secs, 10);
        assert_eq!(config.geocode_endpoint, NOMINATIM_SEARCH_ENDPOINT);
        assert_eq!(config.forecast_endpoint, OPEN_METEO_FORECAST_ENDPOINT);
        assert!(config.user_agent.starts_with("nils-weather-dashboard/"));
    }

    #[test]
    fn config_supports_ttl_and_timeout_overrides() {
        let config = RuntimeConfig::from_pairs(vec![
            (WEATHER_GEOCODE_TTL_SECS_ENV, "120"),
            (WEATHER_FORECAST_TTL_SECS_ENV, " 30 "),
            (WEATHER_HTTP_TIMEOUT_SECS_ENV, "4"),
        ]);

        assert_eq!(config.geocode_ttl_secs, 120);
        assert_eq!(config.forecast_ttl_secs, 30);
        assert_eq!(config.http_timeout_secs, 4);
    }

    #[test]
    fn config_falls_back_when_numeric_override_invalid_or_zero() {
        let config = RuntimeConfig::from_pairs(vec![
            (WEATHER_GEOCODE_TTL_SECS_ENV, "abc"),
            (WEATHER_HTTP_TIMEOUT_SECS_ENV, "0"),
        ]);

        assert_eq!(config.geocode_ttl_secs, GEOCODE_CACHE_TTL_SECS);
        assert_eq!(config.http_timeout_secs, PROVIDER_TIMEOUT_SECS);
    }

    #[test]
    fn config_blank_text_override_keeps_default() {
        let config = RuntimeConfig::from_pairs(vec![
            (WEATHER_USER_AGENT_ENV, "   "),
            (WEATHER_FORECAST_ENDPOINT_ENV, "http://127.0.0.1:9/forecast"),
        ]);

        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.forecast_endpoint, "http://127.0.0.1:9/forecast");
    }
}
