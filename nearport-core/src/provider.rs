use crate::{
    Config, PlaceQuery, WeatherSnapshot,
    provider::{apininjas::ApiNinjasWeather, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod apininjas;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    ApiNinjas,
    OpenWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::ApiNinjas => "apininjas",
            ProviderId::OpenWeather => "openweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::ApiNinjas, ProviderId::OpenWeather]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "apininjas" | "api-ninjas" => Ok(ProviderId::ApiNinjas),
            "openweather" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: apininjas, openweather."
            )),
        }
    }
}

/// Current weather by coordinate or by city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, query: &PlaceQuery) -> anyhow::Result<WeatherSnapshot>;
}

/// Construct a weather provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider_cfg = config.provider_config(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `nearport configure {id}` and enter your API key."
        )
    })?;

    let api_key = provider_cfg.api_key.clone();
    let base_url = provider_cfg.base_url.clone();

    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::ApiNinjas => {
            let mut p = ApiNinjasWeather::new(api_key);
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Box::new(p)
        }
        ProviderId::OpenWeather => {
            let mut p = OpenWeatherProvider::new(api_key);
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Box::new(p)
        }
    };

    Ok(boxed)
}

/// Construct the default weather provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

/// An upstream body is usable only if it carries some data.
pub(crate) fn is_empty_payload(body: &str) -> bool {
    matches!(body.trim(), "" | "null" | "{}" | "[]" | "false")
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
