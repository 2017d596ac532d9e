//! Single-shot location lookup.
//!
//! [`LocationProvider`] answers one "where am I right now" query.  The
//! timeout policy belongs to the provider: [`HttpLocationProvider`] bounds
//! the request with the client timeout from [`LocationConfig`], so callers
//! never wait indefinitely.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{LocationConfig, LocationPriority};

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Google Maps link that opens a pin at these coordinates.
    ///
    /// ```
    /// use sos_alert::response::Coordinates;
    ///
    /// let c = Coordinates::new(12.34, 56.78);
    /// assert_eq!(c.maps_link(), "https://maps.google.com/maps?q=12.34,56.78");
    /// ```
    pub fn maps_link(&self) -> String {
        format!(
            "https://maps.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

// ---------------------------------------------------------------------------
// LocationError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LocationError {
    /// The provider has no fix (disabled, permission missing, lookup refused).
    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("location lookup timed out")]
    Timeout,

    #[error("location request failed: {0}")]
    Request(String),

    #[error("failed to parse location response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LocationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LocationError::Timeout
        } else {
            LocationError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// LocationProvider trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(
        &self,
        priority: LocationPriority,
    ) -> Result<Coordinates, LocationError>;
}

// ---------------------------------------------------------------------------
// HttpLocationProvider
// ---------------------------------------------------------------------------

/// Queries a geolocation endpoint that answers with a JSON object carrying
/// `lat`/`lon` (ip-api style) or `latitude`/`longitude` fields.
pub struct HttpLocationProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpLocationProvider {
    /// Build a provider whose HTTP client enforces `config.timeout_secs`.
    pub fn from_config(config: &LocationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl LocationProvider for HttpLocationProvider {
    async fn current_location(
        &self,
        priority: LocationPriority,
    ) -> Result<Coordinates, LocationError> {
        log::debug!("location: querying {} ({priority:?})", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(LocationError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LocationError::Parse(e.to_string()))?;

        parse_coordinates(&json)
    }
}

/// Extract coordinates from a geolocation JSON body.
pub(crate) fn parse_coordinates(json: &serde_json::Value) -> Result<Coordinates, LocationError> {
    if json["status"].as_str() == Some("fail") {
        let reason = json["message"].as_str().unwrap_or("lookup failed");
        return Err(LocationError::Unavailable(reason.to_string()));
    }

    let lat = json["lat"].as_f64().or_else(|| json["latitude"].as_f64());
    let lon = json["lon"].as_f64().or_else(|| json["longitude"].as_f64());

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
        _ => Err(LocationError::Parse(
            "response has no latitude/longitude".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// FixedLocationProvider / UnavailableLocationProvider
// ---------------------------------------------------------------------------

/// Always reports the same coordinates (stationary installs, demos).
pub struct FixedLocationProvider(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_location(
        &self,
        _priority: LocationPriority,
    ) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// Always fails; the alert message carries the fallback text instead.
pub struct UnavailableLocationProvider;

#[async_trait]
impl LocationProvider for UnavailableLocationProvider {
    async fn current_location(
        &self,
        _priority: LocationPriority,
    ) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unavailable("location lookup disabled".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_link_uses_plain_decimal_coordinates() {
        let c = Coordinates::new(-33.8688, 151.2093);
        assert_eq!(
            c.maps_link(),
            "https://maps.google.com/maps?q=-33.8688,151.2093"
        );
    }

    #[test]
    fn parses_ip_api_body() {
        let body = json!({ "status": "success", "lat": 12.34, "lon": 56.78 });
        assert_eq!(
            parse_coordinates(&body).unwrap(),
            Coordinates::new(12.34, 56.78)
        );
    }

    #[test]
    fn parses_latitude_longitude_body() {
        let body = json!({ "latitude": 1.5, "longitude": -2.25 });
        assert_eq!(
            parse_coordinates(&body).unwrap(),
            Coordinates::new(1.5, -2.25)
        );
    }

    #[test]
    fn failed_status_is_unavailable() {
        let body = json!({ "status": "fail", "message": "private range" });
        let err = parse_coordinates(&body).unwrap_err();
        assert!(matches!(err, LocationError::Unavailable(ref m) if m == "private range"));
    }

    #[test]
    fn missing_fields_is_parse_error() {
        let err = parse_coordinates(&json!({ "city": "Nowhere" })).unwrap_err();
        assert!(matches!(err, LocationError::Parse(_)));
    }

    #[tokio::test]
    async fn fixed_provider_returns_its_coordinates() {
        let provider = FixedLocationProvider(Coordinates::new(1.0, 2.0));
        let c = provider
            .current_location(LocationPriority::HighAccuracy)
            .await
            .unwrap();
        assert_eq!(c, Coordinates::new(1.0, 2.0));
    }

    #[tokio::test]
    async fn unavailable_provider_always_fails() {
        let err = UnavailableLocationProvider
            .current_location(LocationPriority::LowPower)
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::Unavailable(_)));
    }

    #[test]
    fn http_provider_is_object_safe() {
        let provider: Box<dyn LocationProvider> =
            Box::new(HttpLocationProvider::from_config(&LocationConfig::default()));
        drop(provider);
    }
}
