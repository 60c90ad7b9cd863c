use super::helpers::{fetch_trip, fetch_trip_for_update, insert_trip, update_trip};
use super::Engine;

use async_trait::async_trait;
use serde_json::json;
use sqlx::Acquire;
use uuid::Uuid;

use crate::{
    api::{CreateTrip, TripAPI},
    auth::{User, ROLE_CUSTOMER, ROLE_DRIVER},
    entities::{Status, Trip},
    error::{forbidden_error, invalid_transition_error, Error},
};

#[async_trait]
impl TripAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_trip(&self, user: User, params: CreateTrip) -> Result<Trip, Error> {
        if !(user.has_role(ROLE_CUSTOMER) || user.is_admin()) {
            return Err(forbidden_error());
        }

        let mut trip = Trip::new(
            user.id,
            params.origin,
            params.destination,
            params.distance_km,
            params.duration_min,
        );

        if let (Some(distance_km), Some(duration_min)) = (trip.distance_km, trip.duration_min) {
            trip.price = Some(self.estimator.estimate(distance_km, duration_min));
        }

        insert_trip(&self.pool, &trip).await?;

        // The trip exists either way; driver outreach is best-effort.
        self.notify_nearby_drivers(&trip).await;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn find_trip(&self, user: User, id: Uuid) -> Result<Trip, Error> {
        let trip = fetch_trip(&self.pool, &id).await?;

        let readable = user.is_admin()
            || user.id == trip.customer_id
            || trip.driver_id == Some(user.id)
            || (user.has_role(ROLE_DRIVER) && trip.status == Status::Pending);

        if !readable {
            return Err(forbidden_error());
        }

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn accept_trip(&self, user: User, id: Uuid) -> Result<Trip, Error> {
        if !user.has_role(ROLE_DRIVER) {
            return Err(forbidden_error());
        }

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        // The row lock serializes racing accepts: the loser re-reads an
        // accepted trip and gets an invalid transition.
        let mut trip = fetch_trip_for_update(&mut tx, &id).await?;

        trip.accept(user.id)?;

        update_trip(&mut tx, &trip).await?;
        tx.commit().await?;

        self.broadcast(
            trip.id,
            json!({ "event": "accepted", "trip_id": trip.id, "driver_id": user.id }),
        )
        .await;
        self.push(
            trip.customer_id,
            "Driver accepted your ride",
            "Your driver is on the way.",
            json!({ "event": "accepted", "trip_id": trip.id }),
        )
        .await;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_arrived(&self, user: User, id: Uuid) -> Result<Trip, Error> {
        if !user.has_role(ROLE_DRIVER) {
            return Err(forbidden_error());
        }

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut trip = fetch_trip_for_update(&mut tx, &id).await?;

        trip.arrived(user.id)?;

        update_trip(&mut tx, &trip).await?;
        tx.commit().await?;

        self.broadcast(
            trip.id,
            json!({ "event": "arrived", "trip_id": trip.id, "arrived_at": trip.arrived_at }),
        )
        .await;
        self.push(
            trip.customer_id,
            "Driver has arrived",
            "Your driver has arrived at pickup.",
            json!({ "event": "arrived", "trip_id": trip.id }),
        )
        .await;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn start_trip(&self, user: User, id: Uuid) -> Result<Trip, Error> {
        if !user.has_role(ROLE_DRIVER) {
            return Err(forbidden_error());
        }

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut trip = fetch_trip_for_update(&mut tx, &id).await?;

        let token = trip.start(user.id)?;

        update_trip(&mut tx, &trip).await?;
        tx.commit().await?;

        // TTL-backed copy for public resolution; the row keeps the token of
        // record if this fails.
        self.share_links.issue(&token, trip.id).await;

        self.broadcast(
            trip.id,
            json!({
                "event": "started",
                "trip_id": trip.id,
                "started_at": trip.started_at,
                "share_token": token,
            }),
        )
        .await;
        self.push(
            trip.customer_id,
            "Your ride has started",
            "Your trip is underway.",
            json!({ "event": "started", "trip_id": trip.id, "share_token": token }),
        )
        .await;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn end_trip(&self, user: User, id: Uuid) -> Result<Trip, Error> {
        if !user.has_role(ROLE_DRIVER) {
            return Err(forbidden_error());
        }

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut trip = fetch_trip_for_update(&mut tx, &id).await?;

        let revoked = trip.end(user.id)?;

        update_trip(&mut tx, &trip).await?;
        tx.commit().await?;

        if let Some(token) = revoked {
            self.share_links.revoke(&token).await;
        }

        self.broadcast(
            trip.id,
            json!({ "event": "ended", "trip_id": trip.id, "ended_at": trip.ended_at }),
        )
        .await;
        self.push(
            trip.customer_id,
            "Ride completed",
            "Thank you for riding. Your receipt is available in the app.",
            json!({ "event": "ended", "trip_id": trip.id }),
        )
        .await;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_trip(&self, user: User, id: Uuid) -> Result<Trip, Error> {
        let policy = &self.config.cancel;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut trip = fetch_trip_for_update(&mut tx, &id).await?;

        let allowed = user.is_admin()
            || user.id == trip.customer_id
            || (policy.allow_driver && trip.driver_id == Some(user.id));

        if !allowed {
            return Err(forbidden_error());
        }

        if trip.status == Status::InProgress && !policy.allow_in_progress {
            return Err(invalid_transition_error());
        }

        let revoked = trip.cancel(user.id)?;

        update_trip(&mut tx, &trip).await?;
        tx.commit().await?;

        if let Some(token) = revoked {
            self.share_links.revoke(&token).await;
        }

        self.broadcast(
            trip.id,
            json!({ "event": "canceled", "trip_id": trip.id, "canceled_by": user.id }),
        )
        .await;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn reassign_trip(&self, user: User, id: Uuid, driver_id: Uuid) -> Result<Trip, Error> {
        if !user.is_admin() {
            return Err(forbidden_error());
        }

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut trip = fetch_trip_for_update(&mut tx, &id).await?;

        trip.reassign(driver_id)?;

        update_trip(&mut tx, &trip).await?;
        tx.commit().await?;

        self.broadcast(
            trip.id,
            json!({ "event": "reassigned", "trip_id": trip.id, "driver_id": driver_id }),
        )
        .await;

        Ok(trip)
    }
}

impl Engine {
    /// Matching fan-out after trip creation: query the geo index around the
    /// pickup point and ping each candidate driver. Failures are logged and
    /// never reach the customer.
    async fn notify_nearby_drivers(&self, trip: &Trip) {
        let origin = trip.origin.coordinates;
        let search = &self.config.search;

        let drivers = match self
            .geo
            .nearest_drivers(origin.lat, origin.lng, search.radius_km, search.limit)
            .await
        {
            Ok(drivers) => drivers,
            Err(err) => {
                tracing::warn!(
                    trip_id = %trip.id,
                    code = err.code,
                    "nearby driver lookup failed, skipping outreach"
                );
                return;
            }
        };

        tracing::info!(trip_id = %trip.id, count = drivers.len(), "notifying nearby drivers");

        for (driver_id, distance_km) in drivers {
            self.push(
                driver_id,
                "New ride request nearby",
                &format!("Pickup at {}. Tap to accept.", trip.origin.address),
                json!({
                    "type": "new_trip",
                    "trip_id": trip.id,
                    "origin_lat": origin.lat,
                    "origin_lng": origin.lng,
                    "distance_km": distance_km,
                }),
            )
            .await;
        }
    }
}
