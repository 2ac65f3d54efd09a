#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geographic primitives shared across the focomap engine.
//!
//! Provides the [`GeoPoint`] coordinate type, great-circle distance via the
//! haversine formula, and [`MapRegion`] bounding-region math used to frame
//! the agent map view around the current report set.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters used for all distance computation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Padding (degrees) added around a point set when framing a map region.
pub const REGION_PADDING_DEGREES: f64 = 0.02;

/// Fallback latitude span (degrees) when framing a single position.
pub const FALLBACK_LATITUDE_DELTA: f64 = 0.0922;

/// Fallback longitude span (degrees) when framing a single position.
pub const FALLBACK_LONGITUDE_DELTA: f64 = 0.0421;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new point from the given coordinates.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns whether both coordinates are within valid WGS84 range
    /// (latitude in [-90, 90], longitude in [-180, 180]).
    ///
    /// Non-finite coordinates are out of bounds.
    #[must_use]
    pub fn is_in_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance between two points in meters.
///
/// Haversine formula over a spherical Earth of [`EARTH_RADIUS_METERS`].
/// Inputs are degrees and are converted to radians internally. The
/// `atan2` arc form keeps the result finite for coincident and
/// near-antipodal pairs; identical inputs return exactly 0.
#[must_use]
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (dlng / 2.0).sin().powi(2);
    // Float drift can push h past 1.0 at antipodes, which would NaN the sqrt.
    let h = h.min(1.0);
    let arc = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * arc
}

/// A rectangular map viewport: center plus latitude/longitude spans.
///
/// Mirrors the region shape consumed by the mobile map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRegion {
    /// Center of the viewport.
    pub center: GeoPoint,
    /// Total latitude span in degrees.
    pub latitude_delta: f64,
    /// Total longitude span in degrees.
    pub longitude_delta: f64,
}

impl MapRegion {
    /// Computes the padded region covering every point in `points`.
    ///
    /// The center is the midpoint of the bounding box and each span is the
    /// box extent plus [`REGION_PADDING_DEGREES`]. Returns `None` for an
    /// empty point set, in which case callers typically fall back to
    /// [`Self::around`] on the observer position.
    #[must_use]
    pub fn containing(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;

        let mut min_lat = first.latitude;
        let mut max_lat = first.latitude;
        let mut min_lng = first.longitude;
        let mut max_lng = first.longitude;

        for point in &points[1..] {
            min_lat = min_lat.min(point.latitude);
            max_lat = max_lat.max(point.latitude);
            min_lng = min_lng.min(point.longitude);
            max_lng = max_lng.max(point.longitude);
        }

        Some(Self {
            center: GeoPoint::new((min_lat + max_lat) / 2.0, (min_lng + max_lng) / 2.0),
            latitude_delta: (max_lat - min_lat) + REGION_PADDING_DEGREES,
            longitude_delta: (max_lng - min_lng) + REGION_PADDING_DEGREES,
        })
    }

    /// Frames a single position with the default fallback spans.
    #[must_use]
    pub const fn around(center: GeoPoint) -> Self {
        Self {
            center,
            latitude_delta: FALLBACK_LATITUDE_DELTA,
            longitude_delta: FALLBACK_LONGITUDE_DELTA,
        }
    }
}
