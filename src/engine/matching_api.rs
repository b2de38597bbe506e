use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::api::{DriverCandidate, MatchingAPI};
use crate::entities::Coordinates;
use crate::error::Error;
use crate::geo;

#[async_trait]
impl MatchingAPI for Engine {
    /// Full scan over the registry snapshot: online, fresh, within the radius,
    /// closest first. Ties are broken by driver id so results are stable.
    /// Candidates only — binding a driver happens in `accept_ride`.
    #[tracing::instrument(skip(self))]
    async fn find_nearby_drivers(
        &self,
        point: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<DriverCandidate>, Error> {
        let now = Utc::now();
        let staleness_window = self.registry.staleness_window();

        let mut candidates: Vec<DriverCandidate> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|record| record.is_online && record.is_fresh(staleness_window, now))
            .map(|record| {
                let distance_km = geo::distance_km(&point, &record.coordinates);
                DriverCandidate {
                    driver: record,
                    distance_km,
                }
            })
            .filter(|candidate| candidate.distance_km <= radius_km)
            .collect();

        candidates.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.driver.driver_id.cmp(&b.driver.driver_id))
        });

        Ok(candidates)
    }
}
