use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::entities::{Coordinates, DriverLocationRecord};

/// Last-known-location cache, one record per driver. Location pings overwrite
/// the previous position; going offline keeps the position for diagnostics.
/// Staleness is applied by readers, never on write.
pub struct DriverLocationRegistry {
    records: RwLock<HashMap<Uuid, DriverLocationRecord>>,
    staleness_window: Duration,
}

impl DriverLocationRegistry {
    pub fn new(staleness_window: StdDuration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            staleness_window: Duration::seconds(staleness_window.as_secs() as i64),
        }
    }

    pub fn staleness_window(&self) -> Duration {
        self.staleness_window
    }

    /// Upserts the driver's position and stamps `last_seen`. A first ping
    /// creates the record offline; `is_online` is never touched here.
    pub fn update_location(
        &self,
        driver_id: Uuid,
        coordinates: Coordinates,
    ) -> DriverLocationRecord {
        let mut records = self.records.write().unwrap();

        let record = records
            .entry(driver_id)
            .or_insert_with(|| DriverLocationRecord::new(driver_id, coordinates));

        record.coordinates = coordinates;
        record.last_seen = Utc::now();

        record.clone()
    }

    /// Toggles the online flag for a known driver, stamping `last_seen`.
    /// Returns `None` for drivers that have never pinged a location.
    pub fn set_online(&self, driver_id: Uuid, is_online: bool) -> Option<DriverLocationRecord> {
        let mut records = self.records.write().unwrap();

        let record = records.get_mut(&driver_id)?;
        record.is_online = is_online;
        record.last_seen = Utc::now();

        Some(record.clone())
    }

    pub fn get(&self, driver_id: Uuid) -> Option<DriverLocationRecord> {
        self.records.read().unwrap().get(&driver_id).cloned()
    }

    /// Copies out every record so matching scans never hold the lock.
    pub fn snapshot(&self) -> Vec<DriverLocationRecord> {
        self.records.read().unwrap().values().cloned().collect()
    }
}
