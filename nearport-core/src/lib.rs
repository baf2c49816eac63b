//! Core library for the `nearport` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstractions over geolocation, weather and place providers
//! - Haversine distance and nearest-airport selection
//! - The resolution state machine tying them together
//!
//! It is used by `nearport-cli`, but can also be driven by any other front end
//! through [`Orchestrator`].

pub mod config;
pub mod distance;
pub mod error;
pub mod geo;
pub mod model;
pub mod orchestrator;
pub mod place;
pub mod provider;
pub mod select;

pub use config::{Config, ProviderConfig};
pub use distance::distance_km;
pub use error::{LocationError, ResolveError};
pub use geo::{FixedLocator, GeolocationProvider, IpLocator, UnsupportedLocator};
pub use model::{
    AirportCandidate, Coordinate, NearestAirport, PlaceQuery, RankedAirport, WeatherSnapshot,
};
pub use orchestrator::{Orchestrator, ResolutionState, Strategy};
pub use place::PlaceProvider;
pub use provider::{ProviderId, WeatherProvider};
