use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::config::ShareConfig;

/// Opaque 128-bit token granting anonymous read access to one trip's live
/// status.
pub fn generate_token() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// TTL-backed share-token store. The token of record lives on the trip row;
/// the Redis copy exists so public resolution stays off the trips table and
/// tokens lapse on their own if a revoke is ever missed. Every operation
/// here is best-effort: a missing or failing Redis never fails the trip
/// transition that triggered it.
pub struct ShareLinks {
    redis: Option<ConnectionManager>,
    key_prefix: String,
    ttl_seconds: usize,
}

impl ShareLinks {
    pub fn new(redis: Option<ConnectionManager>, config: &ShareConfig) -> Self {
        Self {
            redis,
            key_prefix: config.key_prefix.clone(),
            ttl_seconds: config.ttl_seconds,
        }
    }

    fn key(&self, token: &str) -> String {
        format!("{}{}", self.key_prefix, token)
    }

    #[tracing::instrument(skip(self))]
    pub async fn issue(&self, token: &str, trip_id: Uuid) {
        if let Some(manager) = &self.redis {
            let mut conn = manager.clone();
            let result: Result<(), redis::RedisError> = conn
                .set_ex(self.key(token), trip_id.to_string(), self.ttl_seconds)
                .await;

            if let Err(err) = result {
                tracing::warn!("failed to store share token: {err}");
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn revoke(&self, token: &str) {
        if let Some(manager) = &self.redis {
            let mut conn = manager.clone();
            let result: Result<(), redis::RedisError> = conn.del(self.key(token)).await;

            if let Err(err) = result {
                tracing::warn!("failed to revoke share token: {err}");
            }
        }
    }

    /// Fast-path reverse lookup. `None` covers miss, expiry and Redis
    /// unavailability alike; the caller falls back to the trip row.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, token: &str) -> Option<Uuid> {
        let manager = self.redis.as_ref()?;
        let mut conn = manager.clone();

        match conn.get::<_, Option<String>>(self.key(token)).await {
            Ok(value) => value.and_then(|id| id.parse().ok()),
            Err(err) => {
                tracing::warn!("share token lookup failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_128_bit_hex() {
        let token = generate_token();

        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(generate_token(), generate_token());
    }

    #[tokio::test]
    async fn unconfigured_store_resolves_nothing() {
        let links = ShareLinks::new(None, &ShareConfig::default());

        links.issue("deadbeef", Uuid::new_v4()).await;
        assert!(links.resolve("deadbeef").await.is_none());
    }

    // Runs only when REDIS_URL points at a live Redis.
    async fn test_store() -> Option<ShareLinks> {
        let url = std::env::var("REDIS_URL").ok()?;
        let client = redis::Client::open(url).ok()?;
        let conn = ConnectionManager::new(client).await.ok()?;

        Some(ShareLinks::new(Some(conn), &ShareConfig::default()))
    }

    #[tokio::test]
    async fn issued_tokens_resolve_until_revoked() {
        let Some(links) = test_store().await else { return };

        let token = generate_token();
        let trip_id = Uuid::new_v4();

        assert!(links.resolve(&token).await.is_none());

        links.issue(&token, trip_id).await;
        assert_eq!(links.resolve(&token).await, Some(trip_id));

        links.revoke(&token).await;
        assert!(links.resolve(&token).await.is_none());
    }
}
