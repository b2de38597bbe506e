use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::{MatchingAPI, RideAPI};
use crate::entities::{Location, Party, PaymentMethod, Ride, Status, VehicleType};
use crate::error::{
    already_accepted_error, concurrent_modification_error, invalid_state_transition_error,
    validation_error, Error,
};
use crate::external::directions::{self, RouteSummary};
use crate::geo;
use crate::pubsub::{Event, EventKind, PubSubChannel, Topic};
use crate::store::RideStore;

impl Engine {
    /// Shared accept path: a bid acceptance is a normal accept with the bid
    /// price as fare override. The conditional write on `pending` is the one
    /// place a driver gets bound to a ride, so two rival accepts resolve to
    /// exactly one winner.
    pub(super) async fn accept_internal(
        &self,
        id: Uuid,
        driver_id: Uuid,
        driver_name: Option<String>,
        fare_override: Option<i64>,
    ) -> Result<Ride, Error> {
        let mut ride = self.store.find(id).await?;
        ride.accept(driver_id, driver_name, fare_override)?;

        if !self.store.compare_and_set(id, Status::Pending, &ride).await? {
            let current = self.store.find(id).await?;

            return Err(match current.status {
                Status::Pending => concurrent_modification_error(id),
                Status::Cancelled => {
                    invalid_state_transition_error(id, "accept", &current.status.name())
                }
                _ => already_accepted_error(id),
            });
        }

        self.emit(
            EventKind::RideAccepted,
            &ride,
            &[ride.passenger_id, driver_id],
        )
        .await;

        Ok(ride)
    }

    /// Conditional write for the remaining transitions, with the failed-CAS
    /// re-read turning the plain `false` into a precise error.
    async fn transition(
        &self,
        id: Uuid,
        operation: &str,
        expected: Status,
        ride: &Ride,
    ) -> Result<(), Error> {
        if self.store.compare_and_set(id, expected, ride).await? {
            return Ok(());
        }

        let current = self.store.find(id).await?;

        if current.status == expected {
            Err(concurrent_modification_error(id))
        } else {
            Err(invalid_state_transition_error(
                id,
                operation,
                &current.status.name(),
            ))
        }
    }

    fn parties(ride: &Ride) -> Vec<Uuid> {
        let mut parties = vec![ride.passenger_id];
        parties.extend(ride.driver_id);
        parties
    }
}

#[async_trait]
impl RideAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_ride(
        &self,
        passenger_id: Uuid,
        pickup: Location,
        destination: Location,
        vehicle_type: VehicleType,
        payment_method: PaymentMethod,
    ) -> Result<Ride, Error> {
        if pickup.coordinates == destination.coordinates {
            return Err(validation_error("pickup and destination are identical"));
        }

        let estimate = geo::estimate_fare(
            &pickup.coordinates,
            &destination.coordinates,
            vehicle_type,
            &self.config.fare_table,
        );

        let ride = Ride::new(
            passenger_id,
            pickup,
            destination,
            vehicle_type,
            payment_method,
            &estimate,
        );

        self.store.create(&ride).await?;

        self.emit(EventKind::RideCreated, &ride, &[passenger_id]).await;

        // Fan the request out to every candidate within the search radius.
        let candidates = self
            .find_nearby_drivers(ride.pickup.coordinates, self.config.search_radius_km)
            .await?;

        tracing::info!(ride_id = %ride.id, candidates = candidates.len(), "fanning out ride request");

        let publishes = candidates.iter().map(|candidate| {
            let driver_id = candidate.driver.driver_id;
            let event = Event::new(EventKind::RideCreated, serde_json::json!(&ride));

            async move {
                if let Err(err) = self
                    .channel
                    .publish(&Topic::DriverRequests(driver_id), event)
                    .await
                {
                    tracing::warn!(
                        %driver_id,
                        error = %err.message,
                        "failed to publish ride request"
                    );
                }
            }
        });
        futures::future::join_all(publishes).await;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn find_ride(&self, id: Uuid) -> Result<Ride, Error> {
        self.store.find(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn accept_ride(
        &self,
        id: Uuid,
        driver_id: Uuid,
        driver_name: Option<String>,
    ) -> Result<Ride, Error> {
        self.accept_internal(id, driver_id, driver_name, None).await
    }

    #[tracing::instrument(skip(self))]
    async fn start_ride(&self, id: Uuid) -> Result<Ride, Error> {
        let mut ride = self.store.find(id).await?;
        ride.start()?;

        self.transition(id, "start", Status::Accepted, &ride).await?;

        self.emit(EventKind::RideStarted, &ride, &Self::parties(&ride))
            .await;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn complete_ride(
        &self,
        id: Uuid,
        fare: Option<i64>,
        distance: Option<String>,
        duration: Option<String>,
    ) -> Result<Ride, Error> {
        let mut ride = self.store.find(id).await?;
        ride.complete(fare, distance, duration)?;

        self.transition(id, "complete", Status::InProgress, &ride)
            .await?;

        self.emit(EventKind::RideCompleted, &ride, &Self::parties(&ride))
            .await;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_ride(
        &self,
        id: Uuid,
        reason: String,
        cancelled_by: Party,
    ) -> Result<Ride, Error> {
        let mut ride = self.store.find(id).await?;
        let expected = ride.status;
        ride.cancel(reason, cancelled_by)?;

        if !self.store.compare_and_set(id, expected, &ride).await? {
            let current = self.store.find(id).await?;

            // Cancellation is allowed from any live status, so losing the
            // race to another live transition is a retryable conflict.
            return Err(if current.status.is_terminal() {
                invalid_state_transition_error(id, "cancel", &current.status.name())
            } else {
                concurrent_modification_error(id)
            });
        }

        self.emit(EventKind::RideCancelled, &ride, &Self::parties(&ride))
            .await;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn rate_ride(
        &self,
        id: Uuid,
        score: i32,
        comment: Option<String>,
        rated_by: Party,
    ) -> Result<Ride, Error> {
        let mut ride = self.store.find(id).await?;
        let entry = ride.rate(score, comment, rated_by)?;

        // Merged slot by slot in the store, so a rival rating for the other
        // party is never overwritten.
        match self.store.apply_rating(id, rated_by, &entry).await? {
            Some(ride) => Ok(ride),
            None => Err(validation_error("ride has already been rated by this party")),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn rides_for_participant(
        &self,
        user_id: Uuid,
        role: Party,
        status: Option<Status>,
    ) -> Result<Vec<Ride>, Error> {
        self.store.query_by_participant(user_id, role, status).await
    }

    #[tracing::instrument(skip(self))]
    async fn pending_rides(&self) -> Result<Vec<Ride>, Error> {
        self.store.query_pending(self.config.pending_query_limit).await
    }

    #[tracing::instrument(skip(self))]
    async fn ride_route(&self, id: Uuid) -> Result<RouteSummary, Error> {
        let ride = self.store.find(id).await?;

        directions::fetch_route(ride.pickup.coordinates, ride.destination.coordinates).await
    }
}
