use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: Option<String>,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(ride_id: Uuid, driver_id: Uuid, driver_name: Option<String>, price: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id,
            driver_id,
            driver_name,
            price,
            created_at: Utc::now(),
        }
    }
}
