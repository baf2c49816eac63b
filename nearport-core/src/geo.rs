//! Where am I? Sources for a single coordinate reading.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use tracing::debug;

use crate::{error::LocationError, model::Coordinate};

pub const DEFAULT_IP_LOCATOR_URL: &str = "http://ip-api.com/json";

#[async_trait]
pub trait GeolocationProvider: Send + Sync + Debug {
    /// One reading. No retries; callers re-invoke on user request.
    async fn locate(&self) -> Result<Coordinate, LocationError>;
}

/// Always reports the same coordinate (from config or the command line).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator {
    coordinate: Coordinate,
}

impl FixedLocator {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl GeolocationProvider for FixedLocator {
    async fn locate(&self) -> Result<Coordinate, LocationError> {
        Ok(self.coordinate)
    }
}

/// Used when the platform has no way to determine a position.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedLocator;

#[async_trait]
impl GeolocationProvider for UnsupportedLocator {
    async fn locate(&self) -> Result<Coordinate, LocationError> {
        Err(LocationError::Unavailable(
            "geolocation is not supported on this platform".to_string(),
        ))
    }
}

/// Approximate position from the public IP address (ip-api compatible endpoint).
#[derive(Debug, Clone)]
pub struct IpLocator {
    url: String,
    http: Client,
}

impl IpLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new(DEFAULT_IP_LOCATOR_URL)
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

#[async_trait]
impl GeolocationProvider for IpLocator {
    async fn locate(&self) -> Result<Coordinate, LocationError> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocationError::Unavailable(format!("request failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!(
                "location service responded with status {status}"
            )));
        }

        let body: IpApiResponse = res
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(format!("unreadable response: {e}")))?;

        if body.status != "success" {
            let reason = body.message.unwrap_or_else(|| body.status.clone());
            return Err(LocationError::Denied(reason));
        }

        let (Some(lat), Some(lon)) = (body.lat, body.lon) else {
            return Err(LocationError::Unavailable("response carried no position".to_string()));
        };

        let coordinate = Coordinate::new(lat, lon).ok_or_else(|| {
            LocationError::Unavailable(format!("position out of range: {lat}, {lon}"))
        })?;

        debug!(%coordinate, "Located via IP lookup");
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_locator_returns_its_coordinate() {
        let c = Coordinate::new(37.0, -122.0).unwrap();
        assert_eq!(FixedLocator::new(c).locate().await, Ok(c));
    }

    #[tokio::test]
    async fn unsupported_locator_is_unavailable() {
        let err = UnsupportedLocator.locate().await.unwrap_err();
        assert!(matches!(err, LocationError::Unavailable(_)));
    }
}
