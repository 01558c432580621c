use serde::Deserialize;

use crate::config::MapsConfig;
use crate::geo::{decode_polyline, Coordinate, DirectionsProvider, GeoError, Route};

/// Goong directions HTTP client.
pub struct GoongDirections {
    url: String,
    api_key: Option<String>,
    vehicle: String,
    client: reqwest::blocking::Client,
}

impl GoongDirections {
    pub fn new(config: &MapsConfig, timeout_secs: u64) -> Result<Self, GeoError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GeoError::Directions(e.to_string()))?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &MapsConfig, client: reqwest::blocking::Client) -> Self {
        Self {
            url: config.directions_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            vehicle: config.vehicle.clone(),
            client,
        }
    }
}

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    overview_polyline: Option<Polyline>,
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Deserialize)]
struct Polyline {
    points: String,
}

#[derive(Deserialize)]
struct Leg {
    distance: Option<Distance>,
}

#[derive(Deserialize)]
struct Distance {
    value: f64,
}

impl DirectionsProvider for GoongDirections {
    fn directions(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, GeoError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GeoError::Directions("no maps API key configured".into()))?;

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("origin", origin.to_string()),
                ("destination", destination.to_string()),
                ("vehicle", self.vehicle.clone()),
                ("api_key", api_key.to_string()),
            ])
            .send()
            .map_err(|e| GeoError::Directions(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Directions(format!("status {}", status.as_u16())));
        }

        let parsed: DirectionsResponse = response
            .json()
            .map_err(|e| GeoError::Directions(e.to_string()))?;

        let route = parsed.routes.into_iter().next().ok_or(GeoError::NoRoute)?;
        let points = route.overview_polyline.ok_or(GeoError::NoRoute)?.points;
        let distance_m = route
            .legs
            .first()
            .and_then(|leg| leg.distance.as_ref())
            .map(|d| d.value);

        Ok(Route {
            path: decode_polyline(&points)?,
            distance_m,
        })
    }
}
