//! Forward geocoding against the OpenStreetMap Nominatim search API.
//! Nominatim requires an identifying `User-Agent`; the shared client sets it.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::model::{Coordinates, PlaceQuery};

use super::{ProviderError, execute_request};

pub const PROVIDER_NAME: &str = "nominatim";

#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
    format: &'a str,
    limit: u8,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    lat: String,
    lon: String,
}

pub fn search(
    client: &Client,
    endpoint: &str,
    place: &PlaceQuery,
) -> Result<Coordinates, ProviderError> {
    let text = place.lookup_text();
    let query = SearchQuery {
        q: &text,
        format: "json",
        limit: 1,
    };

    tracing::debug!(query = %text, "geocode request");
    let body = execute_request(client.get(endpoint).query(&query))?;
    parse_search_response(&body, &text)
}

fn parse_search_response(body: &str, text: &str) -> Result<Coordinates, ProviderError> {
    let matches: Vec<SearchMatch> = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("geocode payload: {error}")))?;

    let Some(first) = matches.into_iter().next() else {
        return Err(ProviderError::NotFound(text.to_string()));
    };

    let coordinates = Coordinates {
        latitude: parse_degrees(&first.lat, "lat")?,
        longitude: parse_degrees(&first.lon, "lon")?,
    };
    Ok(coordinates)
}

fn parse_degrees(raw: &str, field: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            ProviderError::InvalidResponse(format!("geocode payload: bad {field} '{raw}'"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominatim_parses_first_match_as_floats() {
        let body = r#"[
            {
                "place_id": 1,
                "lat": "51.5074456",
                "lon": "-0.1277653",
                "display_name": "London, Greater London, England, United Kingdom"
            },
            {
                "place_id": 2,
                "lat": "42.98",
                "lon": "-81.24",
                "display_name": "London, Ontario, Canada"
            }
        ]"#;

        let coordinates = parse_search_response(body, "London, UK").expect("coordinates");
        assert!((coordinates.latitude - 51.5).abs() < 0.05);
        assert!((coordinates.longitude - -0.12).abs() < 0.05);
        assert!(coordinates.is_finite());
    }

    #[test]
    fn nominatim_returns_not_found_on_empty_array() {
        let error = parse_search_response("[]", "Atlantis, Sea").expect_err("must fail");
        assert_eq!(error, ProviderError::NotFound("Atlantis, Sea".to_string()));
    }

    #[test]
    fn nominatim_rejects_non_numeric_coordinates() {
        let body = r#"[{"lat": "north", "lon": "-0.12"}]"#;
        let error = parse_search_response(body, "London, UK").expect_err("must fail");
        assert!(
            matches!(error, ProviderError::InvalidResponse(message) if message.contains("bad lat"))
        );
    }

    #[test]
    fn nominatim_rejects_non_array_payload() {
        let body = r#"{"error": "Unable to geocode"}"#;
        let error = parse_search_response(body, "London, UK").expect_err("must fail");
        assert!(matches!(error, ProviderError::InvalidResponse(_)));
    }
}
