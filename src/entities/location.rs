use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: Coordinates,
    pub address: Option<String>,
}

impl Location {
    pub fn new(coordinates: Coordinates, address: Option<String>) -> Self {
        Self {
            coordinates,
            address,
        }
    }
}

impl From<Coordinates> for Location {
    fn from(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            address: None,
        }
    }
}
