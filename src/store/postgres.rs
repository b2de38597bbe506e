use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{types::Json, Executor, Pool, Postgres, Row};
use uuid::Uuid;

use crate::entities::{Bid, Party, RatingEntry, Ride, Status};
use crate::error::{not_found_error, Error};
use crate::store::RideStore;

pub struct PgRideStore {
    pool: Pool<Postgres>,
}

impl PgRideStore {
    #[tracing::instrument(name = "PgRideStore::new", skip_all)]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        // TODO: move this to migrations
        pool.execute(
            "CREATE TABLE IF NOT EXISTS rides (
                id UUID PRIMARY KEY,
                status VARCHAR NOT NULL,
                passenger_id UUID NOT NULL,
                driver_id UUID,
                requested_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )",
        )
        .await?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS bids (
                id UUID PRIMARY KEY,
                ride_id UUID NOT NULL,
                driver_id UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )",
        )
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl RideStore for PgRideStore {
    #[tracing::instrument(skip(self, ride))]
    async fn create(&self, ride: &Ride) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO rides (id, status, passenger_id, driver_id, requested_at, data)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&ride.id)
            .bind(ride.status.name())
            .bind(&ride.passenger_id)
            .bind(&ride.driver_id)
            .bind(&ride.requested_at)
            .bind(Json(ride)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find(&self, id: Uuid) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(sqlx::query("SELECT data FROM rides WHERE id = $1").bind(&id))
            .await?;

        let result = maybe_result.ok_or_else(not_found_error)?;
        let Json(ride): Json<Ride> = result.try_get("data")?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self, ride))]
    async fn compare_and_set(
        &self,
        id: Uuid,
        expected: Status,
        ride: &Ride,
    ) -> Result<bool, Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query(
                    "UPDATE rides SET status = $3, driver_id = $4, data = $5
                     WHERE id = $1 AND status = $2",
                )
                .bind(&id)
                .bind(expected.name())
                .bind(ride.status.name())
                .bind(&ride.driver_id)
                .bind(Json(ride)),
            )
            .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, entry))]
    async fn apply_rating(
        &self,
        id: Uuid,
        rated_by: Party,
        entry: &RatingEntry,
    ) -> Result<Option<Ride>, Error> {
        let slot = match rated_by {
            Party::Passenger => "passenger",
            Party::Driver => "driver",
        };
        let path = vec!["rating".to_string(), slot.to_string()];

        let mut conn = self.pool.acquire().await?;

        // Patches the one slot in place; the WHERE clause rejects the write
        // when the slot is no longer empty.
        let maybe_result = conn
            .fetch_optional(
                sqlx::query(
                    "UPDATE rides
                     SET data = jsonb_set(
                         CASE WHEN data->'rating' IS NULL OR data->'rating' = 'null'::jsonb
                              THEN jsonb_set(data, '{rating}', '{\"passenger\": null, \"driver\": null}'::jsonb)
                              ELSE data END,
                         $2, $3)
                     WHERE id = $1 AND status = 'completed'
                       AND (data #> $2 IS NULL OR data #> $2 = 'null'::jsonb)
                     RETURNING data",
                )
                .bind(&id)
                .bind(&path)
                .bind(Json(entry)),
            )
            .await?;

        match maybe_result {
            Some(result) => {
                let Json(ride): Json<Ride> = result.try_get("data")?;
                Ok(Some(ride))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn query_by_participant(
        &self,
        user_id: Uuid,
        role: Party,
        status: Option<Status>,
    ) -> Result<Vec<Ride>, Error> {
        let query = match (role, status.is_some()) {
            (Party::Passenger, false) => {
                "SELECT data FROM rides WHERE passenger_id = $1 ORDER BY requested_at DESC"
            }
            (Party::Passenger, true) => {
                "SELECT data FROM rides WHERE passenger_id = $1 AND status = $2
                 ORDER BY requested_at DESC"
            }
            (Party::Driver, false) => {
                "SELECT data FROM rides WHERE driver_id = $1 ORDER BY requested_at DESC"
            }
            (Party::Driver, true) => {
                "SELECT data FROM rides WHERE driver_id = $1 AND status = $2
                 ORDER BY requested_at DESC"
            }
        };

        let mut q = sqlx::query(query).bind(&user_id);
        if let Some(status) = status {
            q = q.bind(status.name());
        }

        let mut conn = self.pool.acquire().await?;
        let results = conn.fetch_all(q).await?;

        let mut rides = Vec::with_capacity(results.len());
        for result in results.iter() {
            let Json(ride): Json<Ride> = result.try_get("data")?;
            rides.push(ride);
        }

        Ok(rides)
    }

    #[tracing::instrument(skip(self))]
    async fn query_pending(&self, limit: i64) -> Result<Vec<Ride>, Error> {
        let mut conn = self.pool.acquire().await?;

        let results = conn
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM rides WHERE status = 'pending'
                     ORDER BY requested_at DESC LIMIT $1",
                )
                .bind(limit),
            )
            .await?;

        let mut rides = Vec::with_capacity(results.len());
        for result in results.iter() {
            let Json(ride): Json<Ride> = result.try_get("data")?;
            rides.push(ride);
        }

        Ok(rides)
    }

    #[tracing::instrument(skip(self, bid))]
    async fn append_bid(&self, bid: &Bid) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO bids (id, ride_id, driver_id, created_at, data)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&bid.id)
            .bind(&bid.ride_id)
            .bind(&bid.driver_id)
            .bind(&bid.created_at)
            .bind(Json(bid)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn bids_for_ride(&self, ride_id: Uuid) -> Result<Vec<Bid>, Error> {
        let mut conn = self.pool.acquire().await?;

        let results = conn
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM bids WHERE ride_id = $1 ORDER BY created_at DESC",
                )
                .bind(&ride_id),
            )
            .await?;

        let mut bids = Vec::with_capacity(results.len());
        for result in results.iter() {
            let Json(bid): Json<Bid> = result.try_get("data")?;
            bids.push(bid);
        }

        Ok(bids)
    }
}
