//! Resolution state machine: location → weather + nearest airport.
//!
//! The [`Orchestrator`] owns the single [`ResolutionState`] and is the only
//! thing that changes it. Front ends read it through [`Orchestrator::state`],
//! react to it through [`Orchestrator::subscribe`] (latest value) or
//! [`Orchestrator::transitions`] (every transition, in order), and drive it
//! with [`Orchestrator::retry`] and [`Orchestrator::submit_city`].
//!
//! Each `retry`/`submit_city` call takes a fresh invocation token. A state is
//! only published while its token is still the newest one, so a superseded
//! invocation can finish its lookups but never overwrites what a later one
//! produced.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::{
    config::{Config, DEFAULT_TIMEOUT_SECS},
    error::{ResolveError, chain_message},
    geo::{FixedLocator, GeolocationProvider, IpLocator, UnsupportedLocator},
    model::{AirportCandidate, Coordinate, NearestAirport, PlaceQuery, WeatherSnapshot},
    place::{PlaceProvider, place_provider_from_config},
    provider::{WeatherProvider, default_provider_from_config},
    select::select,
};

const TRANSITION_BUFFER: usize = 32;

const NO_CITY_REASON: &str =
    "We couldn't work out which city you are in. Enter a city name to continue.";

/// How airport candidates are found once a coordinate is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Query airports by coordinate, concurrently with the weather.
    /// Needs an airport endpoint that accepts `lat`/`lon`.
    #[serde(rename = "direct")]
    Direct,
    /// Reverse-geocode the coordinate to a city, then query airports by city.
    #[default]
    #[serde(rename = "city")]
    CityMediated,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::CityMediated => "city",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Strategy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "direct" => Ok(Strategy::Direct),
            "city" | "city-mediated" => Ok(Strategy::CityMediated),
            _ => Err(anyhow!("Unknown strategy '{value}'. Supported strategies: direct, city.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    Idle,
    Locating,
    Fetching,
    /// Automatic city resolution failed; the user can type a city instead.
    ManualCityRequired {
        reason: String,
        validation_error: Option<String>,
    },
    Ready {
        weather: WeatherSnapshot,
        airport: NearestAirport,
        resolved_at: DateTime<Utc>,
    },
    Failed {
        error: ResolveError,
    },
}

impl ResolutionState {
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionState::Idle => "idle",
            ResolutionState::Locating => "locating",
            ResolutionState::Fetching => "fetching",
            ResolutionState::ManualCityRequired { .. } => "manual-city-required",
            ResolutionState::Ready { .. } => "ready",
            ResolutionState::Failed { .. } => "failed",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ResolutionState::Locating | ResolutionState::Fetching)
    }

    /// No automatic transition follows; only a user command moves on.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ResolutionState::ManualCityRequired { .. }
                | ResolutionState::Ready { .. }
                | ResolutionState::Failed { .. }
        )
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    geo: Arc<dyn GeolocationProvider>,
    weather: Arc<dyn WeatherProvider>,
    places: Arc<dyn PlaceProvider>,
    strategy: Strategy,
    timeout: Duration,
    state: watch::Sender<ResolutionState>,
    events: broadcast::Sender<ResolutionState>,
    generation: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        geo: Arc<dyn GeolocationProvider>,
        weather: Arc<dyn WeatherProvider>,
        places: Arc<dyn PlaceProvider>,
    ) -> Self {
        let (state, _) = watch::channel(ResolutionState::Idle);
        let (events, _) = broadcast::channel(TRANSITION_BUFFER);

        Self {
            geo,
            weather,
            places,
            strategy: Strategy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            state,
            events,
            generation: AtomicU64::new(0),
        }
    }

    /// Wire up providers from configuration. A configured `location` replaces
    /// automatic geolocation; an empty `geolocation_url` disables it.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let geo: Arc<dyn GeolocationProvider> = match config.location {
            Some(at) => Arc::new(FixedLocator::new(at)),
            None => match config.geolocation_url.as_deref().map(str::trim) {
                Some("") => Arc::new(UnsupportedLocator),
                Some(url) => Arc::new(IpLocator::new(url)),
                None => Arc::new(IpLocator::default()),
            },
        };

        let weather: Arc<dyn WeatherProvider> = Arc::from(default_provider_from_config(config)?);
        let places: Arc<dyn PlaceProvider> = Arc::from(place_provider_from_config(config)?);

        Ok(Self::new(geo, weather, places)
            .with_strategy(config.strategy)
            .with_timeout(config.timeout()))
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Bound for every single suspension point (geolocation, each lookup).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn state(&self) -> ResolutionState {
        self.state.borrow().clone()
    }

    /// Latest-value view of the state; intermediate states may be coalesced.
    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.state.subscribe()
    }

    /// Every published transition, in order.
    pub fn transitions(&self) -> broadcast::Receiver<ResolutionState> {
        self.events.subscribe()
    }

    /// Start (or restart) from geolocation. Supersedes any invocation in flight.
    ///
    /// Returns the state once this invocation settles, or the newer state if
    /// it was superseded meanwhile.
    pub async fn retry(&self) -> ResolutionState {
        let token = self.begin();
        self.publish(token, ResolutionState::Locating);

        let next = match self.resolve_from_location(token).await {
            Ok(Some(state)) => state,
            Ok(None) => return self.state(),
            Err(error) => ResolutionState::Failed { error },
        };

        self.finish(token, next);
        self.state()
    }

    /// Continue from `ManualCityRequired` with a user-supplied city name.
    ///
    /// Fails with [`ResolveError::Validation`] without contacting any provider
    /// when the name is blank or no city is being asked for.
    pub async fn submit_city(&self, name: &str) -> Result<ResolutionState, ResolveError> {
        if !matches!(*self.state.borrow(), ResolutionState::ManualCityRequired { .. }) {
            return Err(ResolveError::Validation(
                "A city can only be entered when automatic lookup asks for one".to_string(),
            ));
        }

        let city = name.trim();
        if city.is_empty() {
            let message = "Please enter a city name".to_string();
            let shown = message.clone();
            let events = &self.events;
            self.state.send_if_modified(move |current| match current {
                ResolutionState::ManualCityRequired { validation_error, .. } => {
                    *validation_error = Some(shown);
                    let _ = events.send(current.clone());
                    true
                }
                _ => false,
            });
            return Err(ResolveError::Validation(message));
        }

        let token = self.begin();
        self.publish(token, ResolutionState::Fetching);

        let next = self
            .resolve_city(city.to_string())
            .await
            .unwrap_or_else(|error| ResolutionState::Failed { error });

        self.finish(token, next);
        Ok(self.state())
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }

    /// Replace the state if `token` is still the newest invocation.
    fn publish(&self, token: u64, next: ResolutionState) -> bool {
        let events = &self.events;
        let generation = &self.generation;

        self.state.send_if_modified(move |current| {
            if generation.load(Ordering::SeqCst) != token {
                return false;
            }
            debug!(token, state = next.label(), "State transition");
            *current = next;
            let _ = events.send(current.clone());
            true
        })
    }

    fn finish(&self, token: u64, next: ResolutionState) {
        let outcome = next.clone();
        if !self.publish(token, next) {
            debug!(token, "Invocation superseded, result discarded");
            return;
        }

        match outcome {
            ResolutionState::Ready { airport, .. } => info!(
                airport = %airport.airport().label(),
                distance_km = ?airport.distance_km(),
                "Resolution ready"
            ),
            ResolutionState::Failed { error } => warn!(%error, "Resolution failed"),
            ResolutionState::ManualCityRequired { .. } => info!("Asking for a city name"),
            _ => {}
        }
    }

    /// `Ok(None)` when a newer invocation took over before the lookups started.
    async fn resolve_from_location(
        &self,
        token: u64,
    ) -> Result<Option<ResolutionState>, ResolveError> {
        let at = bounded(
            self.timeout,
            async { self.geo.locate().await.map_err(ResolveError::from) },
            ResolveError::LocationUnavailable,
        )
        .await?;

        if !self.is_current(token) {
            debug!(token, "Superseded after locating, skipping lookups");
            return Ok(None);
        }

        debug!(coordinate = %at, strategy = %self.strategy, "Located");
        self.publish(token, ResolutionState::Fetching);

        let state = match self.strategy {
            Strategy::Direct => self.resolve_direct(at).await?,
            Strategy::CityMediated => self.resolve_via_city(at).await?,
        };
        Ok(Some(state))
    }

    async fn resolve_direct(&self, at: Coordinate) -> Result<ResolutionState, ResolveError> {
        let query = PlaceQuery::Coordinate(at);

        let weather = spawn_lookup(
            fetch_weather(Arc::clone(&self.weather), query.clone(), self.timeout),
            ResolveError::WeatherUnavailable,
        );
        let airports = spawn_lookup(
            lookup_airports(Arc::clone(&self.places), query, self.timeout),
            ResolveError::AirportLookupFailed,
        );

        let (weather, candidates) = join_settled(weather, airports).await.first_error()?;
        let airport = select(&candidates, Some(at))?;

        Ok(ready(weather, airport))
    }

    async fn resolve_via_city(&self, at: Coordinate) -> Result<ResolutionState, ResolveError> {
        let weather = spawn_lookup(
            fetch_weather(Arc::clone(&self.weather), PlaceQuery::Coordinate(at), self.timeout),
            ResolveError::WeatherUnavailable,
        );
        let airports = spawn_lookup(
            airports_via_city(Arc::clone(&self.places), at, self.timeout),
            ResolveError::AirportLookupFailed,
        );

        let joined = join_settled(weather, airports).await;

        // Manual entry refetches the weather by city, so a weather failure here is moot.
        if matches!(joined.second, Ok(None)) {
            if let Err(error) = &joined.first {
                debug!(%error, "Ignoring weather failure, asking for a city instead");
            }
            return Ok(ResolutionState::ManualCityRequired {
                reason: NO_CITY_REASON.to_string(),
                validation_error: None,
            });
        }

        let (weather, candidates) = joined.first_error()?;
        let candidates = candidates.unwrap_or_default();
        let airport = select(&candidates, Some(at))?;

        Ok(ready(weather, airport))
    }

    async fn resolve_city(&self, city: String) -> Result<ResolutionState, ResolveError> {
        let query = PlaceQuery::City(city);

        let weather = fetch_weather(Arc::clone(&self.weather), query.clone(), self.timeout).await?;
        let candidates = lookup_airports(Arc::clone(&self.places), query, self.timeout).await?;
        let airport = select(&candidates, None)?;

        Ok(ready(weather, airport))
    }
}

fn ready(weather: WeatherSnapshot, airport: NearestAirport) -> ResolutionState {
    ResolutionState::Ready {
        weather,
        airport,
        resolved_at: Utc::now(),
    }
}

/// Run `fut` with a deadline; expiry becomes `on_timeout`.
async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, ResolveError>>,
    on_timeout: fn(String) -> ResolveError,
) -> Result<T, ResolveError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(format!("timed out after {limit:?}"))),
    }
}

async fn fetch_weather(
    provider: Arc<dyn WeatherProvider>,
    query: PlaceQuery,
    limit: Duration,
) -> Result<WeatherSnapshot, ResolveError> {
    debug!(%query, "Fetching weather");
    bounded(
        limit,
        async {
            provider
                .fetch(&query)
                .await
                .map_err(|e| ResolveError::WeatherUnavailable(chain_message(&e)))
        },
        ResolveError::WeatherUnavailable,
    )
    .await
}

/// Airport lookup; an empty result counts as a failed lookup.
async fn lookup_airports(
    places: Arc<dyn PlaceProvider>,
    query: PlaceQuery,
    limit: Duration,
) -> Result<Vec<AirportCandidate>, ResolveError> {
    debug!(%query, "Looking up airports");
    let candidates = bounded(
        limit,
        async {
            places
                .find_airports(&query)
                .await
                .map_err(|e| ResolveError::AirportLookupFailed(chain_message(&e)))
        },
        ResolveError::AirportLookupFailed,
    )
    .await?;

    if candidates.is_empty() {
        return Err(ResolveError::AirportLookupFailed(format!(
            "no airports returned for {query}"
        )));
    }
    Ok(candidates)
}

/// Reverse-geocode, then look up airports by city. `Ok(None)`: no usable city.
async fn airports_via_city(
    places: Arc<dyn PlaceProvider>,
    at: Coordinate,
    limit: Duration,
) -> Result<Option<Vec<AirportCandidate>>, ResolveError> {
    let lookup = {
        let places = Arc::clone(&places);
        bounded(
            limit,
            async move {
                places
                    .reverse_geocode(at)
                    .await
                    .map_err(|e| ResolveError::AirportLookupFailed(chain_message(&e)))
            },
            ResolveError::AirportLookupFailed,
        )
    };

    let city = match lookup.await {
        Ok(Some(city)) if !city.trim().is_empty() => city.trim().to_string(),
        Ok(_) => {
            debug!(coordinate = %at, "Reverse geocoding found no city");
            return Ok(None);
        }
        Err(error) => {
            warn!(
                coordinate = %at,
                %error,
                "Reverse geocoding failed, falling back to manual city"
            );
            return Ok(None);
        }
    };

    debug!(%city, "Reverse geocoded");
    lookup_airports(places, PlaceQuery::City(city), limit).await.map(Some)
}

/// Spawn `fut` right away; a panicked task becomes `on_abort`.
fn spawn_lookup<T: Send + 'static>(
    fut: impl Future<Output = Result<T, ResolveError>> + Send + 'static,
    on_abort: fn(String) -> ResolveError,
) -> impl Future<Output = Result<T, ResolveError>> {
    let handle = tokio::spawn(fut);
    async move {
        handle
            .await
            .unwrap_or_else(|e| Err(on_abort(format!("lookup task aborted: {e}"))))
    }
}

/// Both outcomes of two concurrent lookups, and which settled first.
struct Joined<A, B> {
    first: Result<A, ResolveError>,
    second: Result<B, ResolveError>,
    first_settled_first: bool,
}

impl<A, B> Joined<A, B> {
    /// Both values, or the error that settled first. A later error is logged and dropped.
    fn first_error(self) -> Result<(A, B), ResolveError> {
        let first_settled_first = self.first_settled_first;

        match (self.first, self.second) {
            (Ok(a), Ok(b)) => Ok((a, b)),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(a), Err(b)) => {
                let (reported, dropped) = if first_settled_first { (a, b) } else { (b, a) };
                debug!(error = %dropped, "Dropping later error from concurrent lookup");
                Err(reported)
            }
        }
    }
}

/// Await both futures, recording which one finished first.
async fn join_settled<A, B>(
    first: impl Future<Output = Result<A, ResolveError>>,
    second: impl Future<Output = Result<B, ResolveError>>,
) -> Joined<A, B> {
    tokio::pin!(first, second);

    tokio::select! {
        a = &mut first => Joined { first: a, second: second.await, first_settled_first: true },
        b = &mut second => Joined { first: first.await, second: b, first_settled_first: false },
    }
}
