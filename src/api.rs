use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{Coordinates, LocationPing, Payment, Place, Trip};
use crate::error::Error;
use crate::fare::FareQuote;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateTrip {
    pub origin: Place,
    pub destination: Place,
    pub distance_km: Option<f64>,
    pub duration_min: Option<f64>,
}

/// Fare estimation request: either distance/duration supplied directly, or
/// origin/destination coordinates to resolve through a routing provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EstimateFare {
    pub distance_km: Option<f64>,
    pub duration_min: Option<f64>,
    pub origin: Option<Coordinates>,
    pub destination: Option<Coordinates>,
}

/// Read-only snapshot served to anonymous holders of a share token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharedTripView {
    pub trip_id: Uuid,
    pub status: String,
    pub origin: Place,
    pub destination: Place,
    pub driver: Option<SharedDriverView>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharedDriverView {
    pub id: Uuid,
    pub name: Option<String>,
    pub location: Option<Coordinates>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait TripAPI {
    async fn create_trip(&self, user: User, params: CreateTrip) -> Result<Trip, Error>;

    async fn find_trip(&self, user: User, id: Uuid) -> Result<Trip, Error>;

    async fn accept_trip(&self, user: User, id: Uuid) -> Result<Trip, Error>;

    async fn mark_arrived(&self, user: User, id: Uuid) -> Result<Trip, Error>;

    async fn start_trip(&self, user: User, id: Uuid) -> Result<Trip, Error>;

    async fn end_trip(&self, user: User, id: Uuid) -> Result<Trip, Error>;

    async fn cancel_trip(&self, user: User, id: Uuid) -> Result<Trip, Error>;

    async fn reassign_trip(&self, user: User, id: Uuid, driver_id: Uuid) -> Result<Trip, Error>;
}

#[async_trait]
pub trait DriverLocationAPI {
    async fn update_driver_location(&self, user: User, ping: LocationPing) -> Result<(), Error>;

    async fn driver_logout(&self, user: User) -> Result<(), Error>;

    /// Internal matching query; not exposed over HTTP.
    async fn nearest_drivers(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<(Uuid, f64)>, Error>;
}

#[async_trait]
pub trait FareAPI {
    async fn estimate_fare(&self, request: EstimateFare) -> Result<FareQuote, Error>;
}

#[async_trait]
pub trait ShareAPI {
    async fn resolve_share_token(&self, token: String) -> Result<SharedTripView, Error>;
}

#[async_trait]
pub trait PaymentAPI {
    async fn create_payment(
        &self,
        user: User,
        trip_id: Uuid,
        reference: Option<String>,
    ) -> Result<Payment, Error>;
}

pub trait API: TripAPI + DriverLocationAPI + FareAPI + ShareAPI + PaymentAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
