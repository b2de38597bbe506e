use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{DriverCandidate, DynAPI};
use crate::entities::{Coordinates, DriverLocationRecord};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct UpdateLocationParams {
    coordinates: Coordinates,
}

#[derive(Serialize, Deserialize)]
pub struct SetOnlineParams {
    is_online: bool,
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    latitude: f64,
    longitude: f64,
    radius_km: f64,
}

pub async fn update_location(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateLocationParams>,
) -> Result<Json<DriverLocationRecord>, Error> {
    let record = api.update_driver_location(id, params.coordinates).await?;

    Ok(record.into())
}

pub async fn set_online(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<SetOnlineParams>,
) -> Result<Json<DriverLocationRecord>, Error> {
    let record = api.set_driver_online(id, params.is_online).await?;

    Ok(record.into())
}

pub async fn find_location(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverLocationRecord>, Error> {
    let record = api.find_driver_location(id).await?;

    Ok(record.into())
}

pub async fn nearby(
    Extension(api): Extension<DynAPI>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<DriverCandidate>>, Error> {
    let candidates = api
        .find_nearby_drivers(
            Coordinates {
                latitude: query.latitude,
                longitude: query.longitude,
            },
            query.radius_km,
        )
        .await?;

    Ok(candidates.into())
}
