use serde::{Deserialize, Serialize};

/// A named point on the map, as entered by the host or resolved by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(address: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            address: address.into(),
            lat,
            lon,
        }
    }
}
