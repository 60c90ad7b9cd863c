use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Latest known position for a driver. One row per driver, overwritten on
/// every ping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverLocation {
    pub driver_id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// A single location update from a driver client.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LocationPing {
    pub lat: f64,
    pub lng: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
}
