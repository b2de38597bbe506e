use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, VehicleType};

// Radius used by the fare scenarios this service inherited; kept as-is so
// quoted fares stay stable across clients.
const EARTH_RADIUS_KM: f64 = 6137.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VehicleRate {
    pub base_fare: f64,
    pub per_km: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FareTable {
    pub car: VehicleRate,
    pub bike: VehicleRate,
    pub van: VehicleRate,
    pub truck: VehicleRate,
}

impl Default for FareTable {
    fn default() -> Self {
        Self {
            car: VehicleRate {
                base_fare: 50.0,
                per_km: 25.0,
            },
            bike: VehicleRate {
                base_fare: 30.0,
                per_km: 15.0,
            },
            van: VehicleRate {
                base_fare: 70.0,
                per_km: 35.0,
            },
            truck: VehicleRate {
                base_fare: 100.0,
                per_km: 50.0,
            },
        }
    }
}

impl FareTable {
    pub fn rate(&self, vehicle_type: VehicleType) -> VehicleRate {
        match vehicle_type {
            VehicleType::Car => self.car,
            VehicleType::Bike => self.bike,
            VehicleType::Van => self.van,
            VehicleType::Truck => self.truck,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FareEstimate {
    pub fare: i64,
    pub distance_km: f64,
    pub duration_min: i64,
    pub distance_label: String,
    pub duration_label: String,
}

/// Great-circle distance in kilometers. Callers are responsible for keeping
/// coordinates within the [-90, 90] x [-180, 180] domain.
pub fn distance_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Fare quote for a ride between two points. Duration is the 2x-distance
/// heuristic, not a routed estimate; in-ride navigation goes through the
/// directions provider instead.
pub fn estimate_fare(
    pickup: &Coordinates,
    destination: &Coordinates,
    vehicle_type: VehicleType,
    table: &FareTable,
) -> FareEstimate {
    let rate = table.rate(vehicle_type);
    let distance = distance_km(pickup, destination);

    let fare = (rate.base_fare + distance * rate.per_km).round() as i64;
    let duration_min = (distance * 2.0).round() as i64;

    FareEstimate {
        fare,
        distance_km: distance,
        duration_min,
        distance_label: format!("{:.1} km", distance),
        duration_label: format!("{} min", duration_min),
    }
}
