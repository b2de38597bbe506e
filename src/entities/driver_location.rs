use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Coordinates;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverLocationRecord {
    pub driver_id: Uuid,
    pub coordinates: Coordinates,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

impl DriverLocationRecord {
    pub fn new(driver_id: Uuid, coordinates: Coordinates) -> Self {
        Self {
            driver_id,
            coordinates,
            is_online: false,
            last_seen: Utc::now(),
        }
    }

    pub fn is_fresh(&self, staleness_window: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen <= staleness_window
    }
}
