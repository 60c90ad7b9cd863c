use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;

use okada::auth::NullDirectory;
use okada::config::Config;
use okada::engine::Engine;
use okada::notify::{Notifier, NullNotifier, RedisNotifier};
use okada::server::serve;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .unwrap();

    let redis = match &config.redis_url {
        Some(url) => connect_redis(url).await,
        None => None,
    };

    let notifier: Arc<dyn Notifier> = match &redis {
        Some(conn) => Arc::new(RedisNotifier::new(conn.clone())),
        None => Arc::new(NullNotifier),
    };

    let addr = config.bind_addr.parse().unwrap();

    let engine = Engine::new(pool, redis, notifier, Arc::new(NullDirectory), config)
        .await
        .unwrap();

    serve(engine, addr).await;
}

async fn connect_redis(url: &str) -> Option<ConnectionManager> {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!("invalid redis url, running on the scan path: {err}");
            return None;
        }
    };

    match ConnectionManager::new(client).await {
        Ok(conn) => Some(conn),
        Err(err) => {
            tracing::warn!("redis unavailable, running on the scan path: {err}");
            None
        }
    }
}
