//! Great-circle helpers used to rank stops before the routing provider is asked.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two `(lat, lng)` points given in degrees.
pub fn haversine_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_m((40.7128, -74.006), (40.7128, -74.006)), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_on_the_equator() {
        let d = haversine_m((0.0, 0.0), (0.0, 1.0));
        assert!((d - 111_194.93).abs() < 1.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let nyc = (40.7128, -74.006);
        let boston = (42.3601, -71.0589);
        let there = haversine_m(nyc, boston);
        let back = haversine_m(boston, nyc);
        assert!((there - back).abs() < 1e-6);
        assert!((there - 306_000.0).abs() < 2_000.0, "got {there}");
    }

    #[test]
    fn coordinate_bounds() {
        assert!(is_valid_coordinate(90.0, -180.0));
        assert!(!is_valid_coordinate(90.5, 0.0));
        assert!(!is_valid_coordinate(0.0, 181.0));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
    }
}
