use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    model::{AirportCandidate, Coordinate, PlaceQuery},
    provider::{apininjas::DEFAULT_BASE_URL, is_empty_payload, truncate_body},
};

use super::PlaceProvider;

#[derive(Debug, Clone)]
pub struct ApiNinjasPlaces {
    api_key: String,
    base_url: String,
    airports_url: Option<String>,
    http: Client,
}

impl ApiNinjasPlaces {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            airports_url: None,
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Endpoint used for airport lookups, when it differs from `{base}/v1/airports`
    /// (e.g. a service that accepts `lat`/`lon`).
    pub fn with_airports_url(mut self, url: impl Into<String>) -> Self {
        self.airports_url = Some(url.into());
        self
    }

    async fn get_json_body(
        &self,
        url: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<String> {
        let res = self
            .http
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to send request to API Ninjas ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read API Ninjas {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "API Ninjas {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct NinjasPlace {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Text(String),
    Number(f64),
}

impl RawCoordinate {
    fn into_text(self) -> String {
        match self {
            RawCoordinate::Text(s) => s,
            RawCoordinate::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NinjasAirport {
    #[serde(default)]
    name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    iata: String,
    #[serde(default)]
    icao: String,
    latitude: Option<RawCoordinate>,
    longitude: Option<RawCoordinate>,
}

impl From<NinjasAirport> for AirportCandidate {
    fn from(a: NinjasAirport) -> Self {
        AirportCandidate {
            name: a.name,
            city: a.city,
            country: a.country,
            iata: a.iata,
            icao: a.icao,
            latitude: a.latitude.map(RawCoordinate::into_text),
            longitude: a.longitude.map(RawCoordinate::into_text),
        }
    }
}

#[async_trait]
impl PlaceProvider for ApiNinjasPlaces {
    async fn reverse_geocode(&self, at: Coordinate) -> Result<Option<String>> {
        let url = format!("{}/v1/reversegeocoding", self.base_url);
        let params = [("lat", at.latitude.to_string()), ("lon", at.longitude.to_string())];

        let body = self.get_json_body(&url, &params, "reverse geocoding").await?;
        if is_empty_payload(&body) {
            return Ok(None);
        }

        let places: Vec<NinjasPlace> = serde_json::from_str(&body)
            .context("Failed to parse API Ninjas reverse geocoding JSON")?;

        let city = places
            .into_iter()
            .map(|p| p.name.trim().to_string())
            .find(|name| !name.is_empty());

        debug!(coordinate = %at, city = ?city, "Reverse geocoded");
        Ok(city)
    }

    async fn find_airports(&self, query: &PlaceQuery) -> Result<Vec<AirportCandidate>> {
        let url = self
            .airports_url
            .clone()
            .unwrap_or_else(|| format!("{}/v1/airports", self.base_url));

        let params: Vec<(&str, String)> = match query {
            PlaceQuery::Coordinate(c) => {
                vec![("lat", c.latitude.to_string()), ("lon", c.longitude.to_string())]
            }
            PlaceQuery::City(name) => vec![("city", name.clone())],
        };

        let body = self.get_json_body(&url, &params, "airports").await?;
        if is_empty_payload(&body) {
            return Ok(Vec::new());
        }

        let airports: Vec<NinjasAirport> =
            serde_json::from_str(&body).context("Failed to parse API Ninjas airports JSON")?;

        debug!(query = %query, count = airports.len(), "Fetched airport candidates");
        Ok(airports.into_iter().map(AirportCandidate::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airport_coordinates_accept_text_or_numbers() {
        let json = r#"[
            {"name": "A", "latitude": "37.6188", "longitude": "-122.375"},
            {"name": "B", "latitude": 10.5, "longitude": 20},
            {"name": "C"}
        ]"#;
        let raw: Vec<NinjasAirport> = serde_json::from_str(json).unwrap();
        let airports: Vec<AirportCandidate> = raw.into_iter().map(Into::into).collect();

        assert_eq!(airports[0].latitude.as_deref(), Some("37.6188"));
        assert_eq!(airports[1].coordinate(), Coordinate::new(10.5, 20.0));
        assert_eq!(airports[2].coordinate(), None);
    }
}
