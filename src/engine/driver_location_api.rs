use super::Engine;

use async_trait::async_trait;
use serde_json::json;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    api::DriverLocationAPI,
    auth::{User, ROLE_DRIVER},
    entities::LocationPing,
    error::{forbidden_error, Error},
};

#[async_trait]
impl DriverLocationAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn update_driver_location(&self, user: User, ping: LocationPing) -> Result<(), Error> {
        if !user.has_role(ROLE_DRIVER) {
            return Err(forbidden_error());
        }

        self.geo.record_location(user.id, &ping).await?;

        // Relay to live viewers of the driver's in-progress trip, if any.
        if let Some(trip_id) = self.active_trip_for_driver(user.id).await {
            self.broadcast(
                trip_id,
                json!({
                    "event": "location",
                    "trip_id": trip_id,
                    "lat": ping.lat,
                    "lng": ping.lng,
                    "speed": ping.speed,
                }),
            )
            .await;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn driver_logout(&self, user: User) -> Result<(), Error> {
        if !user.has_role(ROLE_DRIVER) {
            return Err(forbidden_error());
        }

        self.geo.remove_driver(user.id).await;

        Ok(())
    }

    async fn nearest_drivers(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<(Uuid, f64)>, Error> {
        self.geo.nearest_drivers(lat, lng, radius_km, limit).await
    }
}

impl Engine {
    async fn active_trip_for_driver(&self, driver_id: Uuid) -> Option<Uuid> {
        let result = sqlx::query(
            "SELECT id FROM trips
             WHERE status = 'in_progress' AND data->>'driver_id' = $1
             ORDER BY data->>'started_at' DESC
             LIMIT 1",
        )
        .bind(driver_id.to_string())
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => row.and_then(|r| r.try_get("id").ok()),
            Err(err) => {
                tracing::warn!(%driver_id, "active trip lookup failed: {err}");
                None
            }
        }
    }
}
