use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::{Bid, Ride};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct SubmitParams {
    driver_id: Uuid,
    driver_name: Option<String>,
    price: i64,
}

pub async fn submit(
    Extension(api): Extension<DynAPI>,
    Path(ride_id): Path<Uuid>,
    Json(params): Json<SubmitParams>,
) -> Result<Json<Bid>, Error> {
    let bid = api
        .submit_bid(ride_id, params.driver_id, params.driver_name, params.price)
        .await?;

    Ok(bid.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<Vec<Bid>>, Error> {
    let bids = api.bids_for_ride(ride_id).await?;

    Ok(bids.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    Path((ride_id, bid_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ride>, Error> {
    let ride = api.accept_bid(ride_id, bid_id).await?;

    Ok(ride.into())
}
