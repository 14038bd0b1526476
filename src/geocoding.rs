use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::geo::Point;

// Nominatim requires an identifying user agent.
const USER_AGENT: &str = concat!("creamery-backend/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Forward-geocoding client against the OpenStreetMap Nominatim API.
///
/// The lookup is an external collaborator: every failure mode (transport
/// error, non-2xx, empty result, unparseable payload) collapses to `None`,
/// which callers treat as "location not resolvable". No retries.
#[derive(Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    country: String,
}

impl Geocoder {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.geocoding_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build geocoding HTTP client, using default: {e}");
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: config.geocoding_base_url.clone(),
            country: config.geocoding_country.clone(),
        }
    }

    /// Resolve a free-text address (optionally narrowed by pincode) to
    /// coordinates.
    pub async fn resolve(&self, address: &str, pincode: Option<&str>) -> Option<Point> {
        let query = match pincode {
            Some(p) if !address.trim().is_empty() => format!("{address}, {p}"),
            Some(p) => p.to_string(),
            None => address.to_string(),
        };

        let url = format!("{}/search", self.base_url);
        let response = match self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("q", query.as_str()),
                ("limit", "1"),
                ("countrycodes", self.country.as_str()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Geocoding request failed for {query:?}: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Geocoding API error for {query:?}: {}", response.status());
            return None;
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Failed to read geocoding response: {e}");
                return None;
            }
        };

        let point = parse_search_response(&body);
        if point.is_none() {
            tracing::debug!("Geocoding returned no usable result for {query:?}");
        }
        point
    }
}

fn parse_search_response(body: &str) -> Option<Point> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body).ok()?;
    let place = places.first()?;
    let latitude = place.lat.parse().ok()?;
    let longitude = place.lon.parse().ok()?;
    Point::new(latitude, longitude).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_nominatim_search_result() {
        let body = r#"[{"place_id":282569056,"licence":"Data © OpenStreetMap contributors",
            "osm_type":"relation","osm_id":2009022,"lat":"13.0836939","lon":"80.270186",
            "display_name":"Chennai, Tamil Nadu, India","boundingbox":["12.8","13.2","80.1","80.3"]}]"#;

        let point = parse_search_response(body).unwrap();
        assert!((point.latitude - 13.0836939).abs() < 1e-9);
        assert!((point.longitude - 80.270186).abs() < 1e-9);
    }

    #[test]
    fn empty_result_list_is_unresolvable() {
        assert!(parse_search_response("[]").is_none());
    }

    #[test]
    fn malformed_payload_is_unresolvable() {
        assert!(parse_search_response("not json").is_none());
        assert!(parse_search_response(r#"[{"lat":"abc","lon":"80.2"}]"#).is_none());
    }
}
