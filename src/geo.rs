//! Route preview for the trip to the patient.
//!
//! Straight-line (haversine) distance, encoded-polyline decoding, and a
//! route planner that prefers the directions service and falls back to the
//! straight line when the service is unavailable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("Invalid coordinate '{0}': expected \"lat,lng\"")]
    InvalidCoordinate(String),

    #[error("Coordinate out of range: {latitude},{longitude}")]
    OutOfRange { latitude: f64, longitude: f64 },

    #[error("Malformed polyline at byte {0}")]
    MalformedPolyline(usize),

    #[error("Directions service error: {0}")]
    Directions(String),

    #[error("Directions service returned no route")]
    NoRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let in_range = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !in_range {
            return Err(GeoError::OutOfRange { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }
}

impl FromStr for Coordinate {
    type Err = GeoError;

    /// Backend format: `"10.7769,106.7009"`, spaces tolerated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| GeoError::InvalidCoordinate(s.to_string()))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| GeoError::InvalidCoordinate(s.to_string()))?;
        let longitude: f64 = lng
            .trim()
            .parse()
            .map_err(|_| GeoError::InvalidCoordinate(s.to_string()))?;
        Coordinate::new(latitude, longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Decode an encoded polyline (precision 5) into coordinates.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, GeoError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;
        points.push(Coordinate::new(lat as f64 / 1e5, lng as f64 / 1e5)?);
    }
    Ok(points)
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, GeoError> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*index).ok_or(GeoError::MalformedPolyline(*index))?;
        if !(63..=126).contains(&byte) || shift > 60 {
            return Err(GeoError::MalformedPolyline(*index));
        }
        *index += 1;
        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}

// ═══════════════════════════════════════════════════════════
// Route planning
// ═══════════════════════════════════════════════════════════

/// Route as returned by a directions provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: Vec<Coordinate>,
    /// Road distance in metres, when the provider reports one.
    pub distance_m: Option<f64>,
}

/// Directions lookup between two points.
pub trait DirectionsProvider: Send + Sync {
    fn directions(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, GeoError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Route,
    StraightLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub source: DistanceSource,
    pub navigation_url: String,
}

/// Plan the trip. A failing provider degrades to straight-line distance
/// with an empty path; it never fails the screen.
pub fn plan_route(
    provider: &dyn DirectionsProvider,
    origin: Coordinate,
    destination: Coordinate,
) -> RouteSummary {
    let (path, distance) = match provider.directions(origin, destination) {
        Ok(route) => {
            let distance = route.distance_m.map(|m| (m / 1000.0, DistanceSource::Route));
            (route.path, distance)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Directions unavailable, using straight-line distance");
            (Vec::new(), None)
        }
    };

    let (distance_km, source) =
        distance.unwrap_or_else(|| (haversine_km(origin, destination), DistanceSource::StraightLine));

    RouteSummary {
        origin,
        destination,
        path,
        distance_km,
        source,
        navigation_url: navigation_url(origin, destination),
    }
}

/// Deep link that opens turn-by-turn navigation in the maps app.
pub fn navigation_url(origin: Coordinate, destination: Coordinate) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&origin={origin}&destination={destination}&travelmode=driving&dir_action=navigate"
    )
}
