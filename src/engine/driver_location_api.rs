use super::Engine;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::api::DriverLocationAPI;
use crate::entities::{Coordinates, DriverLocationRecord};
use crate::error::{not_found_error, Error};
use crate::pubsub::{Event, EventKind, PubSubChannel, Topic};
use crate::store::RideStore;

#[async_trait]
impl DriverLocationAPI for Engine {
    /// Location ping: last writer wins in the registry. While the driver has
    /// an active ride the position is also broadcast on that ride's topic so
    /// the passenger can track them.
    #[tracing::instrument(skip(self))]
    async fn update_driver_location(
        &self,
        driver_id: Uuid,
        coordinates: Coordinates,
    ) -> Result<DriverLocationRecord, Error> {
        let record = self.registry.update_location(driver_id, coordinates);

        let rides = self
            .store
            .query_by_participant(driver_id, crate::entities::Party::Driver, None)
            .await?;

        if let Some(ride) = rides.iter().find(|ride| !ride.status.is_terminal()) {
            let event = Event::new(
                EventKind::DriverLocation,
                json!({ "driver_id": driver_id, "coordinates": coordinates }),
            );

            if let Err(err) = self.channel.publish(&Topic::Ride(ride.id), event).await {
                tracing::warn!(ride_id = %ride.id, error = %err.message, "failed to broadcast location");
            }
        }

        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn set_driver_online(
        &self,
        driver_id: Uuid,
        is_online: bool,
    ) -> Result<DriverLocationRecord, Error> {
        self.registry
            .set_online(driver_id, is_online)
            .ok_or_else(not_found_error)
    }

    #[tracing::instrument(skip(self))]
    async fn find_driver_location(&self, driver_id: Uuid) -> Result<DriverLocationRecord, Error> {
        self.registry.get(driver_id).ok_or_else(not_found_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RideAPI;
    use crate::engine::test_support;
    use crate::entities::{Location, PaymentMethod, VehicleType};
    use crate::pubsub::TopicStream;

    fn karachi() -> Coordinates {
        Coordinates {
            latitude: 24.8607,
            longitude: 67.0011,
        }
    }

    #[tokio::test]
    async fn online_toggle_requires_a_known_driver() {
        let (engine, _) = test_support::engine();
        let driver_id = Uuid::new_v4();

        let err = engine.set_driver_online(driver_id, true).await.unwrap_err();
        assert!(err.is_not_found_error());

        engine
            .update_driver_location(driver_id, karachi())
            .await
            .unwrap();
        let record = engine.set_driver_online(driver_id, true).await.unwrap();
        assert!(record.is_online);
    }

    #[tokio::test]
    async fn active_ride_passengers_see_driver_positions() {
        let (engine, channel) = test_support::engine();
        let driver_id = Uuid::new_v4();

        engine
            .update_driver_location(driver_id, karachi())
            .await
            .unwrap();

        let ride = engine
            .create_ride(
                Uuid::new_v4(),
                Location::from(karachi()),
                Location::from(Coordinates {
                    latitude: 24.8707,
                    longitude: 67.0111,
                }),
                VehicleType::Car,
                PaymentMethod::Cash,
            )
            .await
            .unwrap();
        engine.accept_ride(ride.id, driver_id, None).await.unwrap();

        let mut stream = channel.open(&Topic::Ride(ride.id)).await.unwrap();

        let moved = Coordinates {
            latitude: 24.8627,
            longitude: 67.0021,
        };
        engine
            .update_driver_location(driver_id, moved)
            .await
            .unwrap();

        let event = stream.recv().await.unwrap().unwrap();
        assert_eq!(event.kind, EventKind::DriverLocation);
        assert_eq!(event.data["coordinates"]["latitude"], 24.8627);
    }
}
