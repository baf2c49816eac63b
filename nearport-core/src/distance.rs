use crate::model::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres (haversine, spherical Earth).
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = distance_km(c(0.0, 0.0), c(0.0, 1.0));
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }

    #[test]
    fn same_point_is_zero() {
        for p in [c(0.0, 0.0), c(37.0, -122.0), c(-89.9, 179.9)] {
            assert_eq!(distance_km(p, p), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let pairs = [
            (c(37.0, -122.0), c(37.6188, -122.375)),
            (c(51.47, -0.4543), c(40.6413, -73.7781)),
            (c(-33.9, 151.2), c(35.7, 139.7)),
            (c(10.0, 179.5), c(10.0, -179.5)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance_km(a, b), distance_km(b, a));
        }
    }

    #[test]
    fn london_to_new_york() {
        let d = distance_km(c(51.47, -0.4543), c(40.6413, -73.7781));
        assert!((d - 5555.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn crosses_antimeridian_the_short_way() {
        let d = distance_km(c(0.0, 179.5), c(0.0, -179.5));
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }
}
