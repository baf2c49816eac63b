//! Nearest-airport selection.

use tracing::{debug, warn};

use crate::{
    distance::distance_km,
    error::ResolveError,
    model::{AirportCandidate, Coordinate, NearestAirport, RankedAirport},
};

/// Rank every candidate with a usable position by distance from `reference`.
///
/// The sort is stable, so equally distant candidates keep provider order.
/// Candidates without a parseable coordinate are left out.
pub fn rank(candidates: &[AirportCandidate], reference: Coordinate) -> Vec<RankedAirport> {
    let mut ranked: Vec<RankedAirport> = candidates
        .iter()
        .filter_map(|airport| {
            let position = airport.coordinate()?;
            Some(RankedAirport {
                airport: airport.clone(),
                distance_km: distance_km(reference, position),
            })
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

/// Pick the nearest airport, or the first one when there is no reference point.
pub fn select(
    candidates: &[AirportCandidate],
    reference: Option<Coordinate>,
) -> Result<NearestAirport, ResolveError> {
    let first = candidates.first().ok_or(ResolveError::NoAirportsFound)?;

    let Some(reference) = reference else {
        debug!(airport = %first.label(), "No reference coordinate, taking first candidate");
        return Ok(NearestAirport::Unranked(first.clone()));
    };

    match rank(candidates, reference).into_iter().next() {
        Some(nearest) => {
            debug!(
                airport = %nearest.airport.label(),
                distance_km = nearest.distance_km,
                candidates = candidates.len(),
                "Selected nearest airport"
            );
            Ok(NearestAirport::Ranked(nearest))
        }
        None => {
            warn!(
                candidates = candidates.len(),
                "No candidate has usable coordinates, taking first candidate"
            );
            Ok(NearestAirport::Unranked(first.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(name: &str, lat: &str, lon: &str) -> AirportCandidate {
        AirportCandidate {
            name: name.into(),
            latitude: Some(lat.into()),
            longitude: Some(lon.into()),
            ..Default::default()
        }
    }

    fn origin() -> Coordinate {
        Coordinate::new(0.0, 0.0).unwrap()
    }

    #[test]
    fn picks_closest_by_haversine() {
        let candidates = vec![airport("far", "20", "20"), airport("near", "10", "10")];
        let picked = select(&candidates, Some(origin())).unwrap();

        assert_eq!(picked.airport().name, "near");
        assert!(picked.distance_km().unwrap() > 0.0);
    }

    #[test]
    fn picks_first_listed_when_closer() {
        let candidates = vec![airport("a", "10", "10"), airport("b", "20", "20")];
        let picked = select(&candidates, Some(origin())).unwrap();
        assert_eq!(picked.airport().name, "a");
    }

    #[test]
    fn empty_list_is_no_airports_found() {
        assert_eq!(select(&[], Some(origin())), Err(ResolveError::NoAirportsFound));
        assert_eq!(select(&[], None), Err(ResolveError::NoAirportsFound));
    }

    #[test]
    fn without_reference_takes_first_without_distance() {
        let candidates = vec![airport("first", "20", "20"), airport("second", "0", "0.1")];
        let picked = select(&candidates, None).unwrap();

        assert!(matches!(picked, NearestAirport::Unranked(ref a) if a.name == "first"));
        assert_eq!(picked.distance_km(), None);
    }

    #[test]
    fn ties_keep_provider_order() {
        let candidates = vec![
            airport("east", "0", "1"),
            airport("west", "0", "-1"),
            airport("north", "1", "0"),
        ];
        let ranked = rank(&candidates, origin());

        assert_eq!(ranked[0].airport.name, "east");
        assert_eq!(ranked[1].airport.name, "west");
        assert_eq!(ranked[0].distance_km, ranked[1].distance_km);
    }

    #[test]
    fn unparseable_candidates_are_not_ranked() {
        let mut broken = airport("broken", "n/a", "0");
        broken.latitude = Some("n/a".into());
        let candidates = vec![broken, airport("ok", "5", "5")];

        let ranked = rank(&candidates, origin());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].airport.name, "ok");

        let picked = select(&candidates, Some(origin())).unwrap();
        assert_eq!(picked.airport().name, "ok");
    }

    #[test]
    fn falls_back_to_first_when_nothing_is_rankable() {
        let candidates = vec![
            AirportCandidate {
                name: "no-coords".into(),
                ..Default::default()
            },
            AirportCandidate {
                name: "also-none".into(),
                ..Default::default()
            },
        ];
        let picked = select(&candidates, Some(origin())).unwrap();
        assert!(matches!(picked, NearestAirport::Unranked(ref a) if a.name == "no-coords"));
    }
}
