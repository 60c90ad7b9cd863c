mod driver_location_api;
mod fare_api;
mod helpers;
mod payment_api;
mod share_api;
mod trip_api;

use redis::aio::ConnectionManager;
use serde_json::Value;
use sqlx::{Executor, Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::API,
    auth::ActorDirectory,
    config::Config,
    error::Error,
    external::routing,
    fare::FareEstimator,
    geo::GeoIndex,
    notify::Notifier,
    tracking::ShareLinks,
};

type Database = Postgres;

pub struct Engine {
    pool: Pool<Database>,
    geo: GeoIndex,
    share_links: ShareLinks,
    estimator: FareEstimator,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn ActorDirectory>,
    config: Config,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(
        pool: Pool<Database>,
        redis: Option<ConnectionManager>,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn ActorDirectory>,
        config: Config,
    ) -> Result<Self, Error> {
        // trip service
        pool.execute(
            "CREATE TABLE IF NOT EXISTS trips (id UUID PRIMARY KEY, status VARCHAR NOT NULL, data JSONB NOT NULL)",
        )
        .await?;

        // driver location service (scan path for the geo index)
        pool.execute(
            "CREATE TABLE IF NOT EXISTS driver_locations (driver_id UUID PRIMARY KEY, lat DOUBLE PRECISION NOT NULL, lng DOUBLE PRECISION NOT NULL, speed DOUBLE PRECISION, heading DOUBLE PRECISION, accuracy DOUBLE PRECISION, updated_at TIMESTAMPTZ NOT NULL)",
        )
        .await?;

        // payment records (provider processing happens elsewhere)
        pool.execute(
            "CREATE TABLE IF NOT EXISTS payments (id UUID PRIMARY KEY, reference VARCHAR NOT NULL UNIQUE, status VARCHAR NOT NULL, data JSONB NOT NULL)",
        )
        .await?;

        let geo = GeoIndex::new(pool.clone(), redis.clone(), config.search.geo_key.clone());
        let share_links = ShareLinks::new(redis, &config.share);
        let estimator = FareEstimator::new(
            config.fare.clone(),
            routing::providers_from_config(&config.routing),
        );

        Ok(Self {
            pool,
            geo,
            share_links,
            estimator,
            notifier,
            directory,
            config,
        })
    }
}

impl Engine {
    /// Best-effort trip-channel broadcast. Never fails the caller.
    pub(crate) async fn broadcast(&self, trip_id: Uuid, payload: Value) {
        if let Err(err) = self.notifier.broadcast_to_trip(trip_id, payload).await {
            tracing::warn!(%trip_id, code = err.code, "trip broadcast failed");
        }
    }

    /// Best-effort push to one actor. Never fails the caller.
    pub(crate) async fn push(&self, actor_id: Uuid, title: &str, body: &str, data: Value) {
        if let Err(err) = self.notifier.push_to_actor(actor_id, title, body, data).await {
            tracing::warn!(%actor_id, code = err.code, "push notification failed");
        }
    }
}

impl API for Engine {}
