use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Error;

/// Fan-out seam between the trip engine and whatever delivers the message
/// (websocket layer, push gateway). Implementations are fire-and-forget from
/// the engine's perspective; call sites log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Event broadcast to everyone watching one trip.
    async fn broadcast_to_trip(&self, trip_id: Uuid, payload: Value) -> Result<(), Error>;

    /// Targeted push to a single actor's devices.
    async fn push_to_actor(
        &self,
        actor_id: Uuid,
        title: &str,
        body: &str,
        data: Value,
    ) -> Result<(), Error>;
}

/// Publishes over Redis pub/sub channels. The websocket bridge subscribes to
/// `trip:{id}` per watched trip; the push gateway consumes `push:{actor}`.
pub struct RedisNotifier {
    conn: ConnectionManager,
}

impl RedisNotifier {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn broadcast_to_trip(&self, trip_id: Uuid, payload: Value) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(format!("trip:{trip_id}"), payload.to_string())
            .await?;

        Ok(())
    }

    async fn push_to_actor(
        &self,
        actor_id: Uuid,
        title: &str,
        body: &str,
        data: Value,
    ) -> Result<(), Error> {
        let message = json!({
            "title": title,
            "body": body,
            "data": data,
        });

        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(format!("push:{actor_id}"), message.to_string())
            .await?;

        Ok(())
    }
}

/// No-delivery notifier for deployments without Redis.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn broadcast_to_trip(&self, trip_id: Uuid, payload: Value) -> Result<(), Error> {
        tracing::debug!(%trip_id, %payload, "broadcast dropped, no notifier configured");
        Ok(())
    }

    async fn push_to_actor(
        &self,
        actor_id: Uuid,
        title: &str,
        _body: &str,
        _data: Value,
    ) -> Result<(), Error> {
        tracing::debug!(%actor_id, title, "push dropped, no notifier configured");
        Ok(())
    }
}
