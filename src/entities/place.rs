use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A named point on the map, as supplied by the client at booking time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub coordinates: Coordinates,
}

impl Place {
    pub fn new(address: String, coordinates: Coordinates) -> Self {
        Self {
            address,
            coordinates,
        }
    }
}
