use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{
    Bid, Coordinates, DriverLocationRecord, Location, Party, PaymentMethod, Ride, Status,
    VehicleType,
};
use crate::error::Error;
use crate::external::directions::RouteSummary;

#[async_trait]
pub trait RideAPI {
    async fn create_ride(
        &self,
        passenger_id: Uuid,
        pickup: Location,
        destination: Location,
        vehicle_type: VehicleType,
        payment_method: PaymentMethod,
    ) -> Result<Ride, Error>;

    async fn find_ride(&self, id: Uuid) -> Result<Ride, Error>;

    async fn accept_ride(
        &self,
        id: Uuid,
        driver_id: Uuid,
        driver_name: Option<String>,
    ) -> Result<Ride, Error>;

    async fn start_ride(&self, id: Uuid) -> Result<Ride, Error>;

    async fn complete_ride(
        &self,
        id: Uuid,
        fare: Option<i64>,
        distance: Option<String>,
        duration: Option<String>,
    ) -> Result<Ride, Error>;

    async fn cancel_ride(&self, id: Uuid, reason: String, cancelled_by: Party)
        -> Result<Ride, Error>;

    async fn rate_ride(
        &self,
        id: Uuid,
        score: i32,
        comment: Option<String>,
        rated_by: Party,
    ) -> Result<Ride, Error>;

    async fn rides_for_participant(
        &self,
        user_id: Uuid,
        role: Party,
        status: Option<Status>,
    ) -> Result<Vec<Ride>, Error>;

    async fn pending_rides(&self) -> Result<Vec<Ride>, Error>;

    async fn ride_route(&self, id: Uuid) -> Result<RouteSummary, Error>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverCandidate {
    pub driver: DriverLocationRecord,
    pub distance_km: f64,
}

#[async_trait]
pub trait MatchingAPI {
    async fn find_nearby_drivers(
        &self,
        point: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<DriverCandidate>, Error>;
}

#[async_trait]
pub trait DriverLocationAPI {
    async fn update_driver_location(
        &self,
        driver_id: Uuid,
        coordinates: Coordinates,
    ) -> Result<DriverLocationRecord, Error>;

    async fn set_driver_online(
        &self,
        driver_id: Uuid,
        is_online: bool,
    ) -> Result<DriverLocationRecord, Error>;

    async fn find_driver_location(&self, driver_id: Uuid) -> Result<DriverLocationRecord, Error>;
}

#[async_trait]
pub trait BidAPI {
    async fn submit_bid(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
        driver_name: Option<String>,
        price: i64,
    ) -> Result<Bid, Error>;

    async fn bids_for_ride(&self, ride_id: Uuid) -> Result<Vec<Bid>, Error>;

    async fn accept_bid(&self, ride_id: Uuid, bid_id: Uuid) -> Result<Ride, Error>;
}

pub trait API: RideAPI + MatchingAPI + DriverLocationAPI + BidAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
