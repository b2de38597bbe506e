use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::{Location, Party, PaymentMethod, Ride, Status, VehicleType};
use crate::error::Error;
use crate::external::directions::RouteSummary;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    passenger_id: Uuid,
    pickup: Location,
    destination: Location,
    #[serde(default)]
    vehicle_type: VehicleType,
    payment_method: Option<PaymentMethod>,
}

#[derive(Serialize, Deserialize)]
pub struct AcceptParams {
    driver_id: Uuid,
    driver_name: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CompleteParams {
    fare: Option<i64>,
    distance: Option<String>,
    duration: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CancelParams {
    reason: String,
    cancelled_by: Party,
}

#[derive(Serialize, Deserialize)]
pub struct RateParams {
    score: i32,
    comment: Option<String>,
    rated_by: Party,
}

#[derive(Deserialize)]
pub struct ParticipantQuery {
    role: Party,
    status: Option<Status>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Ride>, Error> {
    let ride = api
        .create_ride(
            params.passenger_id,
            params.pickup,
            params.destination,
            params.vehicle_type,
            params.payment_method.unwrap_or(PaymentMethod::Cash),
        )
        .await?;

    Ok(ride.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, Error> {
    let ride = api.find_ride(id).await?;

    Ok(ride.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<AcceptParams>,
) -> Result<Json<Ride>, Error> {
    let ride = api
        .accept_ride(id, params.driver_id, params.driver_name)
        .await?;

    Ok(ride.into())
}

pub async fn start(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, Error> {
    let ride = api.start_ride(id).await?;

    Ok(ride.into())
}

pub async fn complete(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<CompleteParams>,
) -> Result<Json<Ride>, Error> {
    let ride = api
        .complete_ride(id, params.fare, params.distance, params.duration)
        .await?;

    Ok(ride.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<CancelParams>,
) -> Result<Json<Ride>, Error> {
    let ride = api
        .cancel_ride(id, params.reason, params.cancelled_by)
        .await?;

    Ok(ride.into())
}

pub async fn rate(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<RateParams>,
) -> Result<Json<Ride>, Error> {
    let ride = api
        .rate_ride(id, params.score, params.comment, params.rated_by)
        .await?;

    Ok(ride.into())
}

pub async fn pending(Extension(api): Extension<DynAPI>) -> Result<Json<Vec<Ride>>, Error> {
    let rides = api.pending_rides().await?;

    Ok(rides.into())
}

pub async fn for_participant(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Query(query): Query<ParticipantQuery>,
) -> Result<Json<Vec<Ride>>, Error> {
    let rides = api
        .rides_for_participant(id, query.role, query.status)
        .await?;

    Ok(rides.into())
}

pub async fn route_preview(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<RouteSummary>, Error> {
    let route = api.ride_route(id).await?;

    Ok(route.into())
}
