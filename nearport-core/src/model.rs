use serde::{Deserialize, Serialize};
use std::fmt;

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// What a weather or airport lookup is keyed on.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceQuery {
    Coordinate(Coordinate),
    City(String),
}

impl fmt::Display for PlaceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceQuery::Coordinate(c) => write!(f, "({c})"),
            PlaceQuery::City(name) => f.write_str(name),
        }
    }
}

/// Current conditions. Temperatures in °C, wind speed in m/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_degrees: f64,
    pub cloud_pct: f64,
    pub max_temp: f64,
    pub min_temp: f64,
}

/// An unranked airport record as returned by a lookup.
///
/// Latitude and longitude are kept as the provider's raw text; use
/// [`AirportCandidate::coordinate`] to get a numeric position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AirportCandidate {
    pub name: String,
    pub city: String,
    pub country: String,
    pub iata: String,
    pub icao: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl AirportCandidate {
    /// Parsed position, or `None` when either component is missing or unusable.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let lat = self.latitude.as_deref()?.trim().parse::<f64>().ok()?;
        let lon = self.longitude.as_deref()?.trim().parse::<f64>().ok()?;
        Coordinate::new(lat, lon)
    }

    /// Short label such as `"San Francisco International (SFO)"`.
    pub fn label(&self) -> String {
        let code = if !self.iata.is_empty() { &self.iata } else { &self.icao };
        if code.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({code})", self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAirport {
    pub airport: AirportCandidate,
    pub distance_km: f64,
}

/// Outcome of nearest-airport selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NearestAirport {
    /// Chosen by distance from a reference coordinate.
    Ranked(RankedAirport),
    /// First candidate in provider order; no reference coordinate was available.
    Unranked(AirportCandidate),
}

impl NearestAirport {
    pub fn airport(&self) -> &AirportCandidate {
        match self {
            NearestAirport::Ranked(r) => &r.airport,
            NearestAirport::Unranked(a) => a,
        }
    }

    pub fn distance_km(&self) -> Option<f64> {
        match self {
            NearestAirport::Ranked(r) => Some(r.distance_km),
            NearestAirport::Unranked(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(lat: Option<&str>, lon: Option<&str>) -> AirportCandidate {
        AirportCandidate {
            name: "Test Field".into(),
            latitude: lat.map(str::to_string),
            longitude: lon.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn coordinate_rejects_out_of_range() {
        assert!(Coordinate::new(90.0, 180.0).is_some());
        assert!(Coordinate::new(-90.0, -180.0).is_some());
        assert!(Coordinate::new(90.1, 0.0).is_none());
        assert!(Coordinate::new(0.0, -180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn candidate_coordinate_parses_text() {
        let c = candidate(Some(" 37.6188 "), Some("-122.375")).coordinate().unwrap();
        assert_eq!(c.latitude, 37.6188);
        assert_eq!(c.longitude, -122.375);
    }

    #[test]
    fn candidate_coordinate_missing_or_garbage() {
        assert!(candidate(None, Some("1.0")).coordinate().is_none());
        assert!(candidate(Some("abc"), Some("1.0")).coordinate().is_none());
        assert!(candidate(Some("95.0"), Some("1.0")).coordinate().is_none());
    }

    #[test]
    fn label_prefers_iata_then_icao() {
        let mut a = candidate(None, None);
        assert_eq!(a.label(), "Test Field");
        a.icao = "KTST".into();
        assert_eq!(a.label(), "Test Field (KTST)");
        a.iata = "TST".into();
        assert_eq!(a.label(), "Test Field (TST)");
    }
}
