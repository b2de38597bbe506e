mod memory;
mod postgres;

pub use memory::MemoryRideStore;
pub use postgres::PgRideStore;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Bid, Party, RatingEntry, Ride, Status};
use crate::error::Error;

/// Durable ride storage. Every lifecycle transition goes through
/// `compare_and_set`, which writes the full aggregate only if the stored
/// status still matches the one the caller observed.
#[async_trait]
pub trait RideStore {
    async fn create(&self, ride: &Ride) -> Result<(), Error>;

    async fn find(&self, id: Uuid) -> Result<Ride, Error>;

    /// Conditional write: succeeds iff the stored status equals `expected`.
    /// Returns `false` when the condition failed; the ride is left untouched.
    async fn compare_and_set(&self, id: Uuid, expected: Status, ride: &Ride)
        -> Result<bool, Error>;

    /// Merges one party's rating slot into the stored aggregate of a
    /// completed ride. Ratings do not change the status, so a status-guarded
    /// full write cannot see a rival rating; this is the one mutation that
    /// patches in place. Returns the updated ride, or `None` when the slot is
    /// already taken.
    async fn apply_rating(
        &self,
        id: Uuid,
        rated_by: Party,
        entry: &RatingEntry,
    ) -> Result<Option<Ride>, Error>;

    async fn query_by_participant(
        &self,
        user_id: Uuid,
        role: Party,
        status: Option<Status>,
    ) -> Result<Vec<Ride>, Error>;

    /// Open requests, newest first, bounded.
    async fn query_pending(&self, limit: i64) -> Result<Vec<Ride>, Error>;

    async fn append_bid(&self, bid: &Bid) -> Result<(), Error>;

    /// Bids for a ride, newest first.
    async fn bids_for_ride(&self, ride_id: Uuid) -> Result<Vec<Bid>, Error>;
}

pub type DynRideStore = Arc<dyn RideStore + Send + Sync>;
