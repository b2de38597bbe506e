use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::BidAPI;
use crate::entities::{Bid, Ride};
use crate::error::{invalid_state_transition_error, not_found_error, Error};
use crate::store::RideStore;

#[async_trait]
impl BidAPI for Engine {
    /// Bids never touch the ride aggregate; they accumulate next to it until
    /// the passenger picks one.
    #[tracing::instrument(skip(self))]
    async fn submit_bid(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
        driver_name: Option<String>,
        price: i64,
    ) -> Result<Bid, Error> {
        let ride = self.store.find(ride_id).await?;

        if !ride.is_pending() {
            return Err(invalid_state_transition_error(
                ride_id,
                "bid on",
                &ride.status.name(),
            ));
        }

        let bid = Bid::new(ride_id, driver_id, driver_name, price);
        self.store.append_bid(&bid).await?;

        Ok(bid)
    }

    #[tracing::instrument(skip(self))]
    async fn bids_for_ride(&self, ride_id: Uuid) -> Result<Vec<Bid>, Error> {
        self.store.bids_for_ride(ride_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn accept_bid(&self, ride_id: Uuid, bid_id: Uuid) -> Result<Ride, Error> {
        let bids = self.store.bids_for_ride(ride_id).await?;
        let bid = bids
            .into_iter()
            .find(|bid| bid.id == bid_id)
            .ok_or_else(not_found_error)?;

        self.accept_internal(ride_id, bid.driver_id, bid.driver_name, Some(bid.price))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RideAPI;
    use crate::engine::test_support;
    use crate::entities::{Coordinates, Location, Party, PaymentMethod, Status, VehicleType};

    async fn pending_ride(engine: &Engine) -> Ride {
        engine
            .create_ride(
                Uuid::new_v4(),
                Location::from(Coordinates {
                    latitude: 24.8607,
                    longitude: 67.0011,
                }),
                Location::from(Coordinates {
                    latitude: 24.8707,
                    longitude: 67.0111,
                }),
                VehicleType::Car,
                PaymentMethod::Cash,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn accepted_bid_binds_driver_and_overrides_fare() {
        let (engine, _) = test_support::engine();
        let ride = pending_ride(&engine).await;
        let driver_id = Uuid::new_v4();

        engine
            .submit_bid(ride.id, Uuid::new_v4(), None, 95)
            .await
            .unwrap();
        let bid = engine
            .submit_bid(ride.id, driver_id, Some("Kamran".into()), 75)
            .await
            .unwrap();

        let ride = engine.accept_bid(ride.id, bid.id).await.unwrap();

        assert_eq!(ride.status, Status::Accepted);
        assert_eq!(ride.driver_id, Some(driver_id));
        assert_eq!(ride.fare, 75);
    }

    #[tokio::test]
    async fn bids_require_a_pending_ride() {
        let (engine, _) = test_support::engine();
        let ride = pending_ride(&engine).await;

        engine
            .cancel_ride(ride.id, "no longer needed".into(), Party::Passenger)
            .await
            .unwrap();

        let err = engine
            .submit_bid(ride.id, Uuid::new_v4(), None, 80)
            .await
            .unwrap_err();
        assert!(err.is_invalid_state_transition_error());
    }

    #[tokio::test]
    async fn bids_list_newest_first_without_touching_the_ride() {
        let (engine, _) = test_support::engine();
        let ride = pending_ride(&engine).await;
        let quoted_fare = ride.fare;

        for price in [100, 80, 90] {
            engine
                .submit_bid(ride.id, Uuid::new_v4(), None, price)
                .await
                .unwrap();
        }

        let bids = engine.bids_for_ride(ride.id).await.unwrap();
        assert_eq!(
            bids.iter().map(|b| b.price).collect::<Vec<_>>(),
            vec![90, 80, 100]
        );

        assert_eq!(engine.find_ride(ride.id).await.unwrap().fare, quoted_fare);
    }

    #[tokio::test]
    async fn accepting_an_unknown_bid_is_not_found() {
        let (engine, _) = test_support::engine();
        let ride = pending_ride(&engine).await;

        let err = engine.accept_bid(ride.id, Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found_error());
    }
}
