//! Reverse geocoding and airport lookup.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    AirportCandidate, Config, Coordinate, PlaceQuery, ProviderId,
    place::apininjas::ApiNinjasPlaces,
};

pub mod apininjas;

#[async_trait]
pub trait PlaceProvider: Send + Sync + Debug {
    /// City name for a coordinate. `Ok(None)` means the provider knows no place there.
    async fn reverse_geocode(&self, at: Coordinate) -> anyhow::Result<Option<String>>;

    /// Airports near a coordinate or serving a city, in provider order.
    async fn find_airports(&self, query: &PlaceQuery) -> anyhow::Result<Vec<AirportCandidate>>;
}

/// Place lookups always go through API Ninjas, so its key must be configured.
pub fn place_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn PlaceProvider>> {
    let id = ProviderId::ApiNinjas;
    let provider_cfg = config.provider_config(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}' (needed for airport lookups).\n\
                 Hint: run `nearport configure {id}` and enter your API key."
        )
    })?;

    let mut places = ApiNinjasPlaces::new(provider_cfg.api_key.clone());
    if let Some(url) = &provider_cfg.base_url {
        places = places.with_base_url(url.clone());
    }
    if let Some(url) = &config.airports_url {
        places = places.with_airports_url(url.clone());
    }

    Ok(Box::new(places))
}
