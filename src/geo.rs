use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::outlet::Outlet;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(AppError::BadRequest("Invalid coordinates".into()));
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::BadRequest("Coordinates out of range".into()));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance between two points in kilometers (haversine),
/// rounded to two decimal places.
pub fn haversine_km(from: Point, to: Point) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round2(EARTH_RADIUS_KM * c)
}

fn round2(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

pub fn validate_pincode(pincode: &str) -> Result<&str, AppError> {
    if pincode.len() == 6 && pincode.bytes().all(|b| b.is_ascii_digit()) {
        Ok(pincode)
    } else {
        Err(AppError::BadRequest("Pincode must be exactly 6 digits".into()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutletMatch {
    #[serde(flatten)]
    pub outlet: Outlet,
    /// Absent for outlets matched by exact pincode without stored coordinates.
    pub distance_km: Option<f64>,
}

/// Coordinate-mode resolution: active outlets with stored coordinates whose
/// distance from `point` is within their own delivery radius, optionally
/// capped by `max_km`. Nearest first; equal distances fall back to outlet id
/// so the ordering is deterministic.
pub fn match_by_distance(
    outlets: Vec<Outlet>,
    point: Point,
    max_km: Option<f64>,
) -> Vec<OutletMatch> {
    let mut matches: Vec<(f64, Uuid, Outlet)> = outlets
        .into_iter()
        .filter(|o| o.is_active)
        .filter_map(|o| {
            let coords = o.coordinates()?;
            let distance = haversine_km(point, coords);
            let radius = match max_km {
                Some(cap) => o.delivery_radius_km.min(cap),
                None => o.delivery_radius_km,
            };
            (distance <= radius).then_some((distance, o.id, o))
        })
        .collect();

    matches.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    matches
        .into_iter()
        .map(|(distance, _, outlet)| OutletMatch {
            outlet,
            distance_km: Some(distance),
        })
        .collect()
}

/// Postal-code-mode resolution. Exact pincode equality always qualifies an
/// active outlet, with or without stored coordinates. When the pincode itself
/// resolved to a point, outlets with coordinates additionally qualify by
/// distance within their own delivery radius. Sorted nearest first; exact
/// matches without coordinates sort as distance zero; ties fall back to
/// outlet id.
pub fn match_by_pincode(
    outlets: Vec<Outlet>,
    pincode: &str,
    resolved: Option<Point>,
) -> Vec<OutletMatch> {
    let mut matches: Vec<(f64, Uuid, OutletMatch)> = outlets
        .into_iter()
        .filter(|o| o.is_active)
        .filter_map(|o| {
            let distance = match (o.coordinates(), resolved) {
                (Some(coords), Some(point)) => Some(haversine_km(point, coords)),
                _ => None,
            };
            let within_radius = distance.is_some_and(|d| d <= o.delivery_radius_km);

            if o.pincode != pincode && !within_radius {
                return None;
            }

            let sort_key = distance.unwrap_or(0.0);
            let id = o.id;
            Some((
                sort_key,
                id,
                OutletMatch {
                    outlet: o,
                    distance_km: distance,
                },
            ))
        })
        .collect();

    matches.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    matches.into_iter().map(|(_, _, m)| m).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn outlet(lat: Option<f64>, lon: Option<f64>, radius: f64, pincode: &str) -> Outlet {
        let now = Utc::now();
        Outlet {
            id: Uuid::new_v4(),
            name: "Test Outlet".into(),
            address: "1 Test Street".into(),
            pincode: pincode.into(),
            phone: None,
            latitude: lat,
            longitude: lon,
            delivery_radius_km: radius,
            owner_id: Uuid::new_v4(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn point(lat: f64, lon: f64) -> Point {
        Point::new(lat, lon).unwrap()
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        let p = point(13.0827, 80.2707);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn haversine_chennai_city_center_to_nearby() {
        // ~3.3 km between these two points in Chennai.
        let d = haversine_km(point(13.0827, 80.2707), point(13.06, 80.25));
        assert!((3.0..3.6).contains(&d), "unexpected distance {d}");
    }

    #[test]
    fn haversine_rounds_to_two_decimals() {
        let d = haversine_km(point(13.0827, 80.2707), point(12.9716, 77.5946));
        assert_eq!(d, (d * 100.0).round() / 100.0);
    }

    #[test]
    fn point_rejects_non_finite_and_out_of_range() {
        assert!(Point::new(f64::NAN, 80.0).is_err());
        assert!(Point::new(13.0, f64::INFINITY).is_err());
        assert!(Point::new(91.0, 80.0).is_err());
        assert!(Point::new(13.0, -181.0).is_err());
        assert!(Point::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn pincode_must_be_six_digits() {
        assert!(validate_pincode("600001").is_ok());
        assert!(validate_pincode("60001").is_err());
        assert!(validate_pincode("6000012").is_err());
        assert!(validate_pincode("60000a").is_err());
        assert!(validate_pincode("").is_err());
    }

    #[test]
    fn distance_match_respects_each_outlets_radius() {
        let near = outlet(Some(13.0827), Some(80.2707), 10.0, "600001");
        let tight = outlet(Some(13.0827), Some(80.2707), 1.0, "600001");
        let matches = match_by_distance(vec![near.clone(), tight], point(13.06, 80.25), None);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].outlet.id, near.id);
        let d = matches[0].distance_km.unwrap();
        assert!(d <= 10.0);
    }

    #[test]
    fn distance_match_skips_inactive_and_coordinate_less_outlets() {
        let mut inactive = outlet(Some(13.0827), Some(80.2707), 10.0, "600001");
        inactive.is_active = false;
        let no_coords = outlet(None, None, 10.0, "600001");

        let matches = match_by_distance(vec![inactive, no_coords], point(13.06, 80.25), None);
        assert!(matches.is_empty());
    }

    #[test]
    fn distance_match_sorts_nearest_first() {
        let far = outlet(Some(13.20), Some(80.30), 50.0, "600001");
        let near = outlet(Some(13.07), Some(80.26), 50.0, "600001");
        let matches = match_by_distance(vec![far.clone(), near.clone()], point(13.06, 80.25), None);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].outlet.id, near.id);
        assert_eq!(matches[1].outlet.id, far.id);
        assert!(matches[0].distance_km.unwrap() <= matches[1].distance_km.unwrap());
    }

    #[test]
    fn distance_match_breaks_ties_by_outlet_id() {
        let a = outlet(Some(13.07), Some(80.26), 50.0, "600001");
        let b = outlet(Some(13.07), Some(80.26), 50.0, "600001");
        let lower = a.id.min(b.id);

        let matches = match_by_distance(vec![a, b], point(13.06, 80.25), None);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].outlet.id, lower);
    }

    #[test]
    fn max_distance_override_caps_the_radius() {
        let o = outlet(Some(13.0827), Some(80.2707), 100.0, "600001");
        let p = point(13.06, 80.25);

        assert_eq!(match_by_distance(vec![o.clone()], p, None).len(), 1);
        assert!(match_by_distance(vec![o], p, Some(1.0)).is_empty());
    }

    #[test]
    fn pincode_match_exact_without_coordinates() {
        let o = outlet(None, None, 10.0, "600001");
        let matches = match_by_pincode(vec![o.clone()], "600001", None);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].outlet.id, o.id);
        assert!(matches[0].distance_km.is_none());
    }

    #[test]
    fn pincode_match_by_radius_when_resolved() {
        let o = outlet(Some(13.0827), Some(80.2707), 10.0, "600042");
        let matches = match_by_pincode(vec![o], "600001", Some(point(13.06, 80.25)));

        assert_eq!(matches.len(), 1);
        assert!(matches[0].distance_km.unwrap() <= 10.0);
    }

    #[test]
    fn pincode_match_unresolved_falls_back_to_exact_only() {
        let exact = outlet(Some(13.0827), Some(80.2707), 10.0, "600001");
        let other = outlet(Some(13.07), Some(80.26), 10.0, "600042");

        let matches = match_by_pincode(vec![exact.clone(), other], "600001", None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].outlet.id, exact.id);
    }

    #[test]
    fn pincode_match_empty_when_nothing_qualifies() {
        let o = outlet(Some(28.6139), Some(77.2090), 10.0, "110001");
        assert!(match_by_pincode(vec![o], "600001", Some(point(13.06, 80.25))).is_empty());
    }
}
