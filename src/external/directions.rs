use serde::{Deserialize, Serialize};
use std::env;

use crate::{
    entities::Coordinates,
    error::{upstream_error, Error},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteSummary {
    pub polyline: String,
    pub distance_km: f64,
    pub duration_min: i64,
}

#[derive(Clone, Debug, Deserialize)]
struct Response {
    status: String,
    routes: Option<Vec<RouteLeg>>,
}

#[derive(Clone, Debug, Deserialize)]
struct RouteLeg {
    polyline: String,
    distance_meters: f64,
    duration_seconds: f64,
}

/// Routed polyline and ETA for in-ride navigation. Quotes never go through
/// here; they keep the fixed distance heuristic.
#[tracing::instrument]
pub async fn fetch_route(
    origin: Coordinates,
    destination: Coordinates,
) -> Result<RouteSummary, Error> {
    let api_base = env::var("DIRECTIONS_API_BASE")?;
    let key = env::var("DIRECTIONS_API_KEY")?;
    let url = format!("https://{}/directions/json", api_base);

    let res = reqwest::Client::new()
        .get(url)
        .query(&[("key", key)])
        .query(&[(
            "origin",
            format!("{},{}", origin.latitude, origin.longitude),
        )])
        .query(&[(
            "destination",
            format!("{},{}", destination.latitude, destination.longitude),
        )])
        .send()
        .await?;

    if !res.status().is_success() {
        return Err(upstream_error());
    }

    let body: Response = res.json().await?;

    if body.status != "OK" {
        return Err(upstream_error());
    }

    let leg = body
        .routes
        .and_then(|routes| routes.into_iter().next())
        .ok_or_else(upstream_error)?;

    Ok(RouteSummary {
        polyline: leg.polyline,
        distance_km: leg.distance_meters / 1000.0,
        duration_min: (leg.duration_seconds / 60.0).round() as i64,
    })
}
