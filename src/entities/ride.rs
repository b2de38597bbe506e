use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Location;
use crate::error::{invalid_state_transition_error, validation_error, Error};
use crate::geo::FareEstimate;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub ride_token: String,
    pub status: Status,
    pub passenger_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub driver_name: Option<String>,
    pub pickup: Location,
    pub destination: Location,
    pub vehicle_type: VehicleType,
    pub fare: i64,
    pub distance_label: String,
    pub duration_label: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub requested_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Party>,
    pub rating: Option<RideRating>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Accepted => "accepted".into(),
            Self::InProgress => "in_progress".into(),
            Self::Completed => "completed".into(),
            Self::Cancelled => "cancelled".into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Bike,
    Van,
    Truck,
    #[serde(other)]
    Car,
}

impl Default for VehicleType {
    fn default() -> Self {
        Self::Car
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Wallet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Passenger,
    Driver,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RideRating {
    pub passenger: Option<RatingEntry>,
    pub driver: Option<RatingEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RatingEntry {
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Ride {
    pub fn new(
        passenger_id: Uuid,
        pickup: Location,
        destination: Location,
        vehicle_type: VehicleType,
        payment_method: PaymentMethod,
        estimate: &FareEstimate,
    ) -> Self {
        let id = Uuid::new_v4();

        Self {
            id,
            ride_token: format!("ride_{}", id.simple()),
            status: Status::Pending,
            passenger_id,
            driver_id: None,
            driver_name: None,
            pickup,
            destination,
            vehicle_type,
            fare: estimate.fare,
            distance_label: estimate.distance_label.clone(),
            duration_label: estimate.duration_label.clone(),
            payment_method,
            payment_status: PaymentStatus::Unpaid,
            requested_at: Utc::now(),
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            cancelled_by: None,
            rating: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    #[tracing::instrument]
    pub fn accept(
        &mut self,
        driver_id: Uuid,
        driver_name: Option<String>,
        fare_override: Option<i64>,
    ) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Accepted;
                self.driver_id = Some(driver_id);
                self.driver_name = driver_name;
                if let Some(fare) = fare_override {
                    self.fare = fare;
                }
                self.accepted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(invalid_state_transition_error(
                self.id,
                "accept",
                &self.status.name(),
            )),
        }
    }

    #[tracing::instrument]
    pub fn start(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Accepted => {
                self.status = Status::InProgress;
                self.started_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(invalid_state_transition_error(
                self.id,
                "start",
                &self.status.name(),
            )),
        }
    }

    #[tracing::instrument]
    pub fn complete(
        &mut self,
        fare: Option<i64>,
        distance_label: Option<String>,
        duration_label: Option<String>,
    ) -> Result<(), Error> {
        match self.status {
            Status::InProgress => {
                self.status = Status::Completed;
                if let Some(fare) = fare {
                    self.fare = fare;
                }
                if let Some(distance_label) = distance_label {
                    self.distance_label = distance_label;
                }
                if let Some(duration_label) = duration_label {
                    self.duration_label = duration_label;
                }
                self.completed_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(invalid_state_transition_error(
                self.id,
                "complete",
                &self.status.name(),
            )),
        }
    }

    // The driver id is kept on cancellation after acceptance for audit.
    #[tracing::instrument]
    pub fn cancel(&mut self, reason: String, cancelled_by: Party) -> Result<(), Error> {
        match self.status {
            Status::Pending | Status::Accepted | Status::InProgress => {
                self.status = Status::Cancelled;
                self.cancelled_at = Some(Utc::now());
                self.cancellation_reason = Some(reason);
                self.cancelled_by = Some(cancelled_by);
                Ok(())
            }
            _ => Err(invalid_state_transition_error(
                self.id,
                "cancel",
                &self.status.name(),
            )),
        }
    }

    /// Writes the rating slot for `rated_by` and returns the entry so stores
    /// can merge it into the persisted aggregate without overwriting the
    /// other party's slot.
    #[tracing::instrument]
    pub fn rate(
        &mut self,
        score: i32,
        comment: Option<String>,
        rated_by: Party,
    ) -> Result<RatingEntry, Error> {
        if self.status != Status::Completed {
            return Err(invalid_state_transition_error(
                self.id,
                "rate",
                &self.status.name(),
            ));
        }

        if !(1..=5).contains(&score) {
            return Err(validation_error("rating score must be between 1 and 5"));
        }

        let rating = self.rating.get_or_insert_with(RideRating::default);
        let entry = RatingEntry {
            score,
            comment,
            created_at: Utc::now(),
        };

        let slot = match rated_by {
            Party::Passenger => &mut rating.passenger,
            Party::Driver => &mut rating.driver,
        };

        if slot.is_some() {
            return Err(validation_error("ride has already been rated by this party"));
        }

        *slot = Some(entry.clone());

        Ok(entry)
    }
}
