use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::{Bid, Party, RatingEntry, Ride, RideRating, Status};
use crate::error::{not_found_error, Error};
use crate::store::RideStore;

/// Store twin used by tests and local runs. Holding the single mutex across
/// the read-check-write in `compare_and_set` gives it the same atomicity the
/// conditional UPDATE gives the Postgres store.
pub struct MemoryRideStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rides: HashMap<Uuid, Ride>,
    bids: Vec<Bid>,
}

impl MemoryRideStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryRideStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RideStore for MemoryRideStore {
    async fn create(&self, ride: &Ride) -> Result<(), Error> {
        self.inner.lock().await.rides.insert(ride.id, ride.clone());

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Ride, Error> {
        self.inner
            .lock()
            .await
            .rides
            .get(&id)
            .cloned()
            .ok_or_else(not_found_error)
    }

    async fn compare_and_set(
        &self,
        id: Uuid,
        expected: Status,
        ride: &Ride,
    ) -> Result<bool, Error> {
        let mut inner = self.inner.lock().await;

        let stored = inner.rides.get_mut(&id).ok_or_else(not_found_error)?;
        if stored.status != expected {
            return Ok(false);
        }

        *stored = ride.clone();

        Ok(true)
    }

    async fn apply_rating(
        &self,
        id: Uuid,
        rated_by: Party,
        entry: &RatingEntry,
    ) -> Result<Option<Ride>, Error> {
        let mut inner = self.inner.lock().await;

        let stored = inner.rides.get_mut(&id).ok_or_else(not_found_error)?;
        if stored.status != Status::Completed {
            return Ok(None);
        }

        let rating = stored.rating.get_or_insert_with(RideRating::default);
        let slot = match rated_by {
            Party::Passenger => &mut rating.passenger,
            Party::Driver => &mut rating.driver,
        };

        if slot.is_some() {
            return Ok(None);
        }

        *slot = Some(entry.clone());

        Ok(Some(stored.clone()))
    }

    async fn query_by_participant(
        &self,
        user_id: Uuid,
        role: Party,
        status: Option<Status>,
    ) -> Result<Vec<Ride>, Error> {
        let inner = self.inner.lock().await;

        let mut rides: Vec<Ride> = inner
            .rides
            .values()
            .filter(|ride| match role {
                Party::Passenger => ride.passenger_id == user_id,
                Party::Driver => ride.driver_id == Some(user_id),
            })
            .filter(|ride| status.map_or(true, |status| ride.status == status))
            .cloned()
            .collect();

        rides.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));

        Ok(rides)
    }

    async fn query_pending(&self, limit: i64) -> Result<Vec<Ride>, Error> {
        let inner = self.inner.lock().await;

        let mut rides: Vec<Ride> = inner
            .rides
            .values()
            .filter(|ride| ride.status == Status::Pending)
            .cloned()
            .collect();

        rides.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        rides.truncate(limit.max(0) as usize);

        Ok(rides)
    }

    async fn append_bid(&self, bid: &Bid) -> Result<(), Error> {
        self.inner.lock().await.bids.push(bid.clone());

        Ok(())
    }

    async fn bids_for_ride(&self, ride_id: Uuid) -> Result<Vec<Bid>, Error> {
        let inner = self.inner.lock().await;

        let mut bids: Vec<Bid> = inner
            .bids
            .iter()
            .filter(|bid| bid.ride_id == ride_id)
            .cloned()
            .collect();

        bids.reverse();

        Ok(bids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Coordinates, Location, PaymentMethod, VehicleType};
    use crate::geo;

    fn ride_between(passenger_id: Uuid, from: (f64, f64), to: (f64, f64)) -> Ride {
        let pickup = Location::from(Coordinates {
            latitude: from.0,
            longitude: from.1,
        });
        let destination = Location::from(Coordinates {
            latitude: to.0,
            longitude: to.1,
        });
        let estimate = geo::estimate_fare(
            &pickup.coordinates,
            &destination.coordinates,
            VehicleType::Car,
            &geo::FareTable::default(),
        );

        Ride::new(
            passenger_id,
            pickup,
            destination,
            VehicleType::Car,
            PaymentMethod::Cash,
            &estimate,
        )
    }

    fn test_ride() -> Ride {
        ride_between(Uuid::new_v4(), (24.8607, 67.0011), (24.8707, 67.0111))
    }

    #[tokio::test]
    async fn cas_requires_matching_status() {
        let store = MemoryRideStore::new();
        let mut ride = test_ride();
        store.create(&ride).await.unwrap();

        let id = ride.id;
        ride.accept(Uuid::new_v4(), None, None).unwrap();

        assert!(store
            .compare_and_set(id, Status::Pending, &ride)
            .await
            .unwrap());

        // Same expected status no longer matches.
        assert!(!store
            .compare_and_set(id, Status::Pending, &ride)
            .await
            .unwrap());

        assert_eq!(store.find(id).await.unwrap().status, Status::Accepted);
    }

    #[tokio::test]
    async fn cas_on_unknown_ride_is_not_found() {
        let store = MemoryRideStore::new();
        let ride = test_ride();

        let err = store
            .compare_and_set(Uuid::new_v4(), Status::Pending, &ride)
            .await
            .unwrap_err();
        assert!(err.is_not_found_error());
    }

    #[tokio::test]
    async fn ratings_merge_without_overwriting() {
        let store = MemoryRideStore::new();
        let mut ride = test_ride();
        ride.accept(Uuid::new_v4(), None, None).unwrap();
        ride.start().unwrap();
        ride.complete(None, None, None).unwrap();
        let id = ride.id;
        store.create(&ride).await.unwrap();

        // Both parties rate from copies observed before either wrote.
        let mut passenger_copy = store.find(id).await.unwrap();
        let mut driver_copy = store.find(id).await.unwrap();
        let passenger_entry = passenger_copy.rate(5, None, Party::Passenger).unwrap();
        let driver_entry = driver_copy.rate(4, None, Party::Driver).unwrap();

        assert!(store
            .apply_rating(id, Party::Passenger, &passenger_entry)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .apply_rating(id, Party::Driver, &driver_entry)
            .await
            .unwrap()
            .is_some());

        let rating = store.find(id).await.unwrap().rating.unwrap();
        assert_eq!(rating.passenger.unwrap().score, 5);
        assert_eq!(rating.driver.unwrap().score, 4);

        // The same slot twice is rejected.
        assert!(store
            .apply_rating(id, Party::Passenger, &passenger_entry)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn pending_query_is_bounded_newest_first() {
        let store = MemoryRideStore::new();

        for _ in 0..4 {
            store.create(&test_ride()).await.unwrap();
        }

        let pending = store.query_pending(3).await.unwrap();
        assert_eq!(pending.len(), 3);
        assert!(pending
            .windows(2)
            .all(|pair| pair[0].requested_at >= pair[1].requested_at));
    }

    #[tokio::test]
    async fn bids_listed_newest_first() {
        let store = MemoryRideStore::new();
        let ride_id = Uuid::new_v4();

        for price in [100, 90, 110] {
            store
                .append_bid(&Bid::new(ride_id, Uuid::new_v4(), None, price))
                .await
                .unwrap();
        }
        store
            .append_bid(&Bid::new(Uuid::new_v4(), Uuid::new_v4(), None, 70))
            .await
            .unwrap();

        let bids = store.bids_for_ride(ride_id).await.unwrap();
        assert_eq!(
            bids.iter().map(|b| b.price).collect::<Vec<_>>(),
            vec![110, 90, 100]
        );
    }

    #[tokio::test]
    async fn participant_query_filters_by_role_and_status() {
        let store = MemoryRideStore::new();
        let passenger_id = Uuid::new_v4();
        let driver_id = Uuid::new_v4();

        let mut ride = ride_between(passenger_id, (24.8607, 67.0011), (24.8707, 67.0111));
        let id = ride.id;
        store.create(&ride).await.unwrap();
        ride.accept(driver_id, None, None).unwrap();
        store
            .compare_and_set(id, Status::Pending, &ride)
            .await
            .unwrap();

        store.create(&test_ride()).await.unwrap();

        let as_passenger = store
            .query_by_participant(passenger_id, Party::Passenger, None)
            .await
            .unwrap();
        assert_eq!(as_passenger.len(), 1);

        let as_driver = store
            .query_by_participant(driver_id, Party::Driver, Some(Status::Accepted))
            .await
            .unwrap();
        assert_eq!(as_driver.len(), 1);
        assert_eq!(as_driver[0].id, id);

        let completed = store
            .query_by_participant(driver_id, Party::Driver, Some(Status::Completed))
            .await
            .unwrap();
        assert!(completed.is_empty());
    }
}
