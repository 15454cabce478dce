use std::time::Duration;

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, Display)]
#[display(fmt = "({}, {})", latitude, longitude)]
pub struct GeoPoint {
    #[schema(example = -6.2088)]
    pub latitude: f64,
    #[schema(example = 106.8456)]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in metres (haversine).
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// Office location and the radius considered on-site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub center: GeoPoint,
    pub radius_m: f64,
}

impl Geofence {
    pub fn distance_m(&self, point: &GeoPoint) -> f64 {
        self.center.distance_to(point)
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.distance_m(point) <= self.radius_m
    }
}

/// Something that can be asked for the scanner's current position.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn locate(&self) -> Option<GeoPoint>;
}

/// Coordinate already submitted alongside the scan.
pub struct SubmittedLocation(pub Option<GeoPoint>);

#[async_trait]
impl LocationSource for SubmittedLocation {
    async fn locate(&self) -> Option<GeoPoint> {
        self.0.filter(GeoPoint::is_valid)
    }
}

/// Waits at most `timeout` for a position; gives up with `None` otherwise.
pub async fn acquire(source: &dyn LocationSource, timeout: Duration) -> Option<GeoPoint> {
    match tokio::time::timeout(timeout, source.locate()).await {
        Ok(point) => point,
        Err(_) => {
            debug!(timeout_ms = timeout.as_millis() as u64, "location request timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverResolves;

    #[async_trait]
    impl LocationSource for NeverResolves {
        async fn locate(&self) -> Option<GeoPoint> {
            futures::future::pending::<()>().await;
            None
        }
    }

    #[test]
    fn distance_between_jakarta_and_bandung() {
        let jakarta = GeoPoint::new(-6.2088, 106.8456);
        let bandung = GeoPoint::new(-6.9175, 107.6191);
        let km = jakarta.distance_to(&bandung) / 1000.0;
        assert!((115.0..120.0).contains(&km), "got {km} km");
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(-6.2, 106.8);
        assert!(p.distance_to(&p).abs() < 1e-6);
    }

    #[test]
    fn geofence_radius_is_inclusive_of_nearby_points() {
        let fence = Geofence {
            center: GeoPoint::new(-6.2088, 106.8456),
            radius_m: 100.0,
        };
        assert!(fence.contains(&GeoPoint::new(-6.2089, 106.8457)));
        assert!(!fence.contains(&GeoPoint::new(-6.2188, 106.8456)));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::NAN).is_valid());
        assert!(GeoPoint::new(-6.2, 106.8).is_valid());
    }

    #[actix_web::test]
    async fn submitted_location_drops_invalid_points() {
        let source = SubmittedLocation(Some(GeoPoint::new(200.0, 0.0)));
        assert_eq!(acquire(&source, Duration::from_secs(1)).await, None);
    }

    #[actix_web::test]
    async fn slow_location_source_degrades_to_none() {
        let point = acquire(&NeverResolves, Duration::from_millis(20)).await;
        assert_eq!(point, None);
    }
}
