use thiserror::Error;

/// Failures reported by a [`GeolocationProvider`](crate::geo::GeolocationProvider).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("Location permission denied: {0}")]
    Denied(String),
    #[error("Location service unavailable: {0}")]
    Unavailable(String),
}

/// Everything that can end a resolution in `Failed`, plus local input validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Unable to retrieve your location: {0}")]
    LocationDenied(String),

    #[error("Geolocation is not available: {0}")]
    LocationUnavailable(String),

    #[error("Failed to fetch weather data: {0}")]
    WeatherUnavailable(String),

    #[error("Failed to look up airports: {0}")]
    AirportLookupFailed(String),

    #[error("No airports found")]
    NoAirportsFound,

    #[error("{0}")]
    Validation(String),
}

impl From<LocationError> for ResolveError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::Denied(msg) => ResolveError::LocationDenied(msg),
            LocationError::Unavailable(msg) => ResolveError::LocationUnavailable(msg),
        }
    }
}

/// Render an `anyhow` chain on one line, e.g. `"request failed: connection refused"`.
pub(crate) fn chain_message(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_error_maps_onto_taxonomy() {
        let denied: ResolveError = LocationError::Denied("user declined".into()).into();
        assert_eq!(denied, ResolveError::LocationDenied("user declined".into()));

        let missing: ResolveError = LocationError::Unavailable("no gps".into()).into();
        assert!(matches!(missing, ResolveError::LocationUnavailable(_)));
    }

    #[test]
    fn messages_are_human_readable() {
        let err = ResolveError::WeatherUnavailable("status 502".into());
        assert_eq!(err.to_string(), "Failed to fetch weather data: status 502");
        assert_eq!(ResolveError::NoAirportsFound.to_string(), "No airports found");
    }

    #[test]
    fn chain_message_includes_context() {
        let err = anyhow::anyhow!("connection refused").context("request failed");
        assert_eq!(chain_message(&err), "request failed: connection refused");
    }
}
