use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::{PlaceQuery, WeatherSnapshot};

use super::{WeatherProvider, is_empty_payload, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.api-ninjas.com";

#[derive(Debug, Clone)]
pub struct ApiNinjasWeather {
    api_key: String,
    base_url: String,
    http: Client,
}

impl ApiNinjasWeather {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct NinjasWeather {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    wind_speed: f64,
    wind_degrees: f64,
    cloud_pct: f64,
    max_temp: f64,
    min_temp: f64,
}

impl From<NinjasWeather> for WeatherSnapshot {
    fn from(w: NinjasWeather) -> Self {
        WeatherSnapshot {
            temp: w.temp,
            feels_like: w.feels_like,
            humidity: w.humidity,
            wind_speed: w.wind_speed,
            wind_degrees: w.wind_degrees,
            cloud_pct: w.cloud_pct,
            max_temp: w.max_temp,
            min_temp: w.min_temp,
        }
    }
}

#[async_trait]
impl WeatherProvider for ApiNinjasWeather {
    async fn fetch(&self, query: &PlaceQuery) -> Result<WeatherSnapshot> {
        let url = format!("{}/v1/weather", self.base_url);

        let params: Vec<(&str, String)> = match query {
            PlaceQuery::Coordinate(c) => {
                vec![("lat", c.latitude.to_string()), ("lon", c.longitude.to_string())]
            }
            PlaceQuery::City(name) => vec![("city", name.clone())],
        };

        let res = self
            .http
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&params)
            .send()
            .await
            .context("Failed to send request to API Ninjas (weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read API Ninjas weather response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "API Ninjas weather request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        if is_empty_payload(&body) {
            return Err(anyhow!("API Ninjas returned no weather data for {query}"));
        }

        let parsed: NinjasWeather =
            serde_json::from_str(&body).context("Failed to parse API Ninjas weather JSON")?;

        Ok(parsed.into())
    }
}
