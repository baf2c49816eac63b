use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::{PlaceQuery, WeatherSnapshot};

use super::{WeatherProvider, is_empty_payload, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
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
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    temp_max: f64,
    temp_min: f64,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize, Default)]
struct OwClouds {
    #[serde(default)]
    all: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
}

impl From<OwCurrentResponse> for WeatherSnapshot {
    fn from(r: OwCurrentResponse) -> Self {
        WeatherSnapshot {
            temp: r.main.temp,
            feels_like: r.main.feels_like,
            humidity: r.main.humidity,
            wind_speed: r.wind.speed,
            wind_degrees: r.wind.deg,
            cloud_pct: r.clouds.all,
            max_temp: r.main.temp_max,
            min_temp: r.main.temp_min,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, query: &PlaceQuery) -> Result<WeatherSnapshot> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let mut params: Vec<(&str, String)> = match query {
            PlaceQuery::Coordinate(c) => {
                vec![("lat", c.latitude.to_string()), ("lon", c.longitude.to_string())]
            }
            PlaceQuery::City(name) => vec![("q", name.clone())],
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        if is_empty_payload(&body) {
            return Err(anyhow!("OpenWeather returned no weather data for {query}"));
        }

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather current JSON")?;

        Ok(parsed.into())
    }
}
