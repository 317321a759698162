use crate::models::location::{GeoPoint, Location};
use crate::models::zone::DeliveryZone;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Great-circle distance between two locations, or `None` when either side has
/// no GPS fix. Callers treat an undefined distance as "not batchable".
pub fn distance_km(a: &Location, b: &Location) -> Option<f64> {
    Some(haversine_km(&a.point()?, &b.point()?))
}

/// Fails closed: a point without coordinates is never inside a zone.
pub fn zone_contains(zone: &DeliveryZone, point: &Location) -> bool {
    match distance_km(&zone.center, point) {
        Some(distance) => distance <= zone.radius_km,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{distance_km, haversine_km, zone_contains};
    use crate::models::location::{GeoPoint, Location};
    use crate::models::zone::DeliveryZone;

    fn zone(lat: f64, lng: f64, radius_km: f64) -> DeliveryZone {
        DeliveryZone {
            id: Uuid::from_u128(1),
            name: "test-zone".to_string(),
            center: Location::new(lat, lng),
            radius_km,
            max_batch_size: 3,
            max_batch_distance_km: 2.0,
            base_delivery_fee: 5.0,
            estimated_delivery_minutes: 45,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 53.5511,
            lng: 9.9937,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint {
            lat: 51.5074,
            lng: -0.1278,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = haversine_km(&london, &paris);
        assert!((distance - 343.0).abs() < 5.0);
    }

    #[test]
    fn distance_is_undefined_without_a_fix() {
        let fixed = Location::new(53.5511, 9.9937);
        let missing = Location::default();
        let half = Location {
            latitude: Some(53.5511),
            longitude: None,
        };

        assert!(distance_km(&fixed, &missing).is_none());
        assert!(distance_km(&missing, &fixed).is_none());
        assert!(distance_km(&fixed, &half).is_none());
        assert!(distance_km(&fixed, &fixed).is_some());
    }

    #[test]
    fn zone_contains_point_inside_radius() {
        let zone = zone(52.52, 13.405, 5.0);
        let nearby = Location::new(52.53, 13.41);
        let far = Location::new(53.0, 14.0);

        assert!(zone_contains(&zone, &nearby));
        assert!(!zone_contains(&zone, &far));
    }

    #[test]
    fn zone_never_contains_point_without_fix() {
        let zone = zone(52.52, 13.405, 5.0);
        assert!(!zone_contains(&zone, &Location::default()));
    }
}
