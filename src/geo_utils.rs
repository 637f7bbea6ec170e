//! Geographic utilities: great-circle distance and path length.

use crate::GeoPoint;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometres (Haversine).
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Total length of a path in kilometres, summed over consecutive pairs.
pub fn path_distance_km(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_km(&w[0], &w[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = GeoPoint::new(51.5074, -0.1278);
        assert_eq!(haversine_km(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_symmetric() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        assert_eq!(haversine_km(&london, &paris), haversine_km(&paris, &london));
    }

    #[test]
    fn test_haversine_known_distance() {
        // London to Paris is roughly 344 km
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let d = haversine_km(&london, &paris);
        assert!(d > 330.0 && d < 355.0, "got {} km", d);
    }

    #[test]
    fn test_path_distance_is_pairwise_sum() {
        let points = vec![
            GeoPoint::new(51.5074, -0.1278),
            GeoPoint::new(51.5080, -0.1290),
            GeoPoint::new(51.5090, -0.1300),
            GeoPoint::new(51.5100, -0.1310),
        ];
        let expected: f64 = points
            .windows(2)
            .map(|w| haversine_km(&w[0], &w[1]))
            .sum();
        assert_eq!(path_distance_km(&points), expected);
    }

    #[test]
    fn test_path_distance_degenerate() {
        assert_eq!(path_distance_km(&[]), 0.0);
        assert_eq!(path_distance_km(&[GeoPoint::new(0.0, 0.0)]), 0.0);
    }
}
