use redis::aio::ConnectionManager;
use redis::geo::{Coord, RadiusOptions, RadiusOrder, RadiusSearchResult, Unit};
use redis::AsyncCommands;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::entities::{DriverLocation, LocationPing};
use crate::error::Error;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two WGS84 points, in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Equirectangular bounding box around a point, in degrees:
/// `(min_lat, max_lat, min_lng, max_lng)`. A cheap pre-filter for the scan
/// path; haversine is the actual distance metric.
pub fn bounding_box(lat: f64, lng: f64, radius_km: f64) -> (f64, f64, f64, f64) {
    let lat_deg = radius_km / 111.0;
    let lng_deg = radius_km / (111.320 * lat.to_radians().cos());

    (lat - lat_deg, lat + lat_deg, lng - lng_deg, lng + lng_deg)
}

/// Exact ranking over pre-filtered candidate rows `(driver_id, lat, lng)`:
/// haversine filter to `radius_km`, ascending sort, cap at `limit`.
fn rank_candidates(
    lat: f64,
    lng: f64,
    radius_km: f64,
    limit: usize,
    candidates: Vec<(Uuid, f64, f64)>,
) -> Vec<(Uuid, f64)> {
    let mut ranked: Vec<(Uuid, f64)> = candidates
        .into_iter()
        .map(|(driver_id, driver_lat, driver_lng)| {
            (driver_id, haversine_km(lat, lng, driver_lat, driver_lng))
        })
        .filter(|(_, distance)| *distance <= radius_km)
        .collect();

    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

/// Proximity index over live driver positions. Writes go to the durable
/// `driver_locations` table and, best-effort, to a Redis geo set; radius
/// queries prefer the geo set and silently fall back to a bounding-box scan
/// of the table when Redis is absent or failing.
pub struct GeoIndex {
    pool: Pool<Postgres>,
    redis: Option<ConnectionManager>,
    geo_key: String,
}

impl GeoIndex {
    pub fn new(pool: Pool<Postgres>, redis: Option<ConnectionManager>, geo_key: String) -> Self {
        Self {
            pool,
            redis,
            geo_key,
        }
    }

    fn member(driver_id: Uuid) -> String {
        format!("driver:{driver_id}")
    }

    /// Latest-wins upsert of a driver's position.
    #[tracing::instrument(skip(self))]
    pub async fn record_location(&self, driver_id: Uuid, ping: &LocationPing) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO driver_locations (driver_id, lat, lng, speed, heading, accuracy, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, now())
             ON CONFLICT (driver_id) DO UPDATE SET
                 lat = EXCLUDED.lat,
                 lng = EXCLUDED.lng,
                 speed = EXCLUDED.speed,
                 heading = EXCLUDED.heading,
                 accuracy = EXCLUDED.accuracy,
                 updated_at = now()",
        )
        .bind(driver_id)
        .bind(ping.lat)
        .bind(ping.lng)
        .bind(ping.speed)
        .bind(ping.heading)
        .bind(ping.accuracy)
        .execute(&self.pool)
        .await?;

        if let Some(manager) = &self.redis {
            let mut conn = manager.clone();
            let result: Result<usize, redis::RedisError> = conn
                .geo_add(
                    &self.geo_key,
                    (Coord::lon_lat(ping.lng, ping.lat), Self::member(driver_id)),
                )
                .await;

            if let Err(err) = result {
                tracing::warn!("geo index write failed, scan path will serve: {err}");
            }
        }

        Ok(())
    }

    /// Drops the driver from the fast-path index on logout. The durable row
    /// stays for audit. Idempotent; index errors are swallowed.
    #[tracing::instrument(skip(self))]
    pub async fn remove_driver(&self, driver_id: Uuid) {
        if let Some(manager) = &self.redis {
            let mut conn = manager.clone();
            let result: Result<usize, redis::RedisError> =
                conn.zrem(&self.geo_key, Self::member(driver_id)).await;

            if let Err(err) = result {
                tracing::warn!("geo index removal failed: {err}");
            }
        }
    }

    /// K nearest drivers within `radius_km`, ascending by distance.
    #[tracing::instrument(skip(self))]
    pub async fn nearest_drivers(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<(Uuid, f64)>, Error> {
        if let Some(found) = self.nearest_from_index(lat, lng, radius_km, limit).await {
            return Ok(found);
        }

        self.nearest_from_scan(lat, lng, radius_km, limit).await
    }

    async fn nearest_from_index(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Option<Vec<(Uuid, f64)>> {
        let manager = self.redis.as_ref()?;
        let mut conn = manager.clone();

        let options = RadiusOptions::default()
            .with_dist()
            .order(RadiusOrder::Asc)
            .limit(limit);

        let results: Result<Vec<RadiusSearchResult>, redis::RedisError> = conn
            .geo_radius(&self.geo_key, lng, lat, radius_km, Unit::Kilometers, options)
            .await;

        match results {
            Ok(members) => Some(
                members
                    .into_iter()
                    .filter_map(|member| {
                        let driver_id = member.name.strip_prefix("driver:")?.parse().ok()?;
                        Some((driver_id, member.dist.unwrap_or(0.0)))
                    })
                    .collect(),
            ),
            Err(err) => {
                tracing::warn!("geo index query failed, falling back to scan: {err}");
                None
            }
        }
    }

    async fn nearest_from_scan(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<(Uuid, f64)>, Error> {
        let (min_lat, max_lat, min_lng, max_lng) = bounding_box(lat, lng, radius_km);

        let rows = sqlx::query(
            "SELECT driver_id, lat, lng FROM driver_locations
             WHERE lat BETWEEN $1 AND $2 AND lng BETWEEN $3 AND $4",
        )
        .bind(min_lat)
        .bind(max_lat)
        .bind(min_lng)
        .bind(max_lng)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());

        for row in rows.iter() {
            let driver_id: Uuid = row.try_get("driver_id")?;
            let driver_lat: f64 = row.try_get("lat")?;
            let driver_lng: f64 = row.try_get("lng")?;
            candidates.push((driver_id, driver_lat, driver_lng));
        }

        Ok(rank_candidates(lat, lng, radius_km, limit, candidates))
    }

    /// Latest persisted position for one driver, if any.
    pub async fn latest_for(&self, driver_id: Uuid) -> Result<Option<DriverLocation>, Error> {
        let maybe_row = sqlx::query(
            "SELECT driver_id, lat, lng, speed, heading, accuracy, updated_at
             FROM driver_locations WHERE driver_id = $1",
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;

        match maybe_row {
            Some(row) => Ok(Some(DriverLocation {
                driver_id: row.try_get("driver_id")?,
                lat: row.try_get("lat")?,
                lng: row.try_get("lng")?,
                speed: row.try_get("speed")?,
                heading: row.try_get("heading")?,
                accuracy: row.try_get("accuracy")?,
                updated_at: row.try_get("updated_at")?,
            })),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_DEG_KM: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

    #[test]
    fn haversine_zero_for_identical_points() {
        assert_eq!(haversine_km(6.5244, 3.3792, 6.5244, 3.3792), 0.0);
    }

    #[test]
    fn haversine_one_degree_along_equator() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - ONE_DEG_KM).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn haversine_one_degree_along_meridian() {
        let d = haversine_km(10.0, 20.0, 11.0, 20.0);
        assert!((d - ONE_DEG_KM).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn haversine_antipodal_is_half_circumference() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        let half = EARTH_RADIUS_KM * std::f64::consts::PI;
        assert!((d - half).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn haversine_known_city_pair() {
        // Lagos to Ibadan, roughly 128 km great-circle
        let d = haversine_km(6.5244, 3.3792, 7.3775, 3.9470);
        assert!(d > 110.0 && d < 145.0, "got {d}");
    }

    #[test]
    fn bounding_box_widens_with_latitude() {
        let (min_lat, max_lat, min_lng, max_lng) = bounding_box(0.0, 0.0, 5.0);
        assert!((max_lat - min_lat - 2.0 * 5.0 / 111.0).abs() < 1e-9);
        assert!((max_lng - min_lng - 2.0 * 5.0 / 111.320).abs() < 1e-9);

        let (_, _, min_lng_north, max_lng_north) = bounding_box(60.0, 0.0, 5.0);
        // cos(60) = 0.5, so the longitude window doubles
        assert!(max_lng_north - min_lng_north > (max_lng - min_lng) * 1.9);
    }

    #[test]
    fn ranking_orders_filters_and_caps() {
        let origin = (0.0, 0.0);
        let near = Uuid::new_v4();
        let mid = Uuid::new_v4();
        let far = Uuid::new_v4();

        // offsets along the equator sized to 1 km, 3 km and 10 km
        let candidates = vec![
            (far, 10.0 / ONE_DEG_KM, 0.0),
            (near, 1.0 / ONE_DEG_KM, 0.0),
            (mid, 3.0 / ONE_DEG_KM, 0.0),
        ];

        let ranked = rank_candidates(origin.0, origin.1, 5.0, 10, candidates);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, near);
        assert_eq!(ranked[1].0, mid);
        assert!((ranked[0].1 - 1.0).abs() < 1e-3);
        assert!((ranked[1].1 - 3.0).abs() < 1e-3);
    }

    #[test]
    fn ranking_respects_limit() {
        let candidates: Vec<(Uuid, f64, f64)> = (1..=5)
            .map(|i| (Uuid::new_v4(), i as f64 / ONE_DEG_KM, 0.0))
            .collect();

        let ranked = rank_candidates(0.0, 0.0, 100.0, 3, candidates);

        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn ranking_of_empty_input_is_empty() {
        assert!(rank_candidates(0.0, 0.0, 5.0, 10, vec![]).is_empty());
    }

    // Runs only when DATABASE_URL points at a live Postgres.
    async fn test_pool() -> Option<Pool<Postgres>> {
        use sqlx::Executor;

        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .ok()?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS driver_locations (driver_id UUID PRIMARY KEY, lat DOUBLE PRECISION NOT NULL, lng DOUBLE PRECISION NOT NULL, speed DOUBLE PRECISION, heading DOUBLE PRECISION, accuracy DOUBLE PRECISION, updated_at TIMESTAMPTZ NOT NULL)",
        )
        .await
        .ok()?;

        Some(pool)
    }

    #[tokio::test]
    async fn repeated_pings_keep_only_the_latest_row() {
        let Some(pool) = test_pool().await else { return };

        let index = GeoIndex::new(pool.clone(), None, "drivers:locations".into());
        let driver = Uuid::new_v4();

        let first = LocationPing {
            lat: 6.5244,
            lng: 3.3792,
            speed: Some(8.0),
            heading: None,
            accuracy: None,
        };
        let second = LocationPing {
            lat: 6.6018,
            lng: 3.3515,
            speed: None,
            heading: Some(90.0),
            accuracy: Some(5.0),
        };

        index.record_location(driver, &first).await.unwrap();
        index.record_location(driver, &second).await.unwrap();

        let latest = index.latest_for(driver).await.unwrap().unwrap();
        assert_eq!(latest.lat, second.lat);
        assert_eq!(latest.lng, second.lng);
        assert_eq!(latest.speed, None);
        assert_eq!(latest.heading, Some(90.0));

        // one row per driver: the scan finds the driver once, at the new
        // position, and not at the old one 9 km away
        let found = index
            .nearest_drivers(second.lat, second.lng, 1.0, 50)
            .await
            .unwrap();
        assert_eq!(found.iter().filter(|(id, _)| *id == driver).count(), 1);

        let stale = index
            .nearest_drivers(first.lat, first.lng, 1.0, 50)
            .await
            .unwrap();
        assert!(stale.iter().all(|(id, _)| *id != driver));

        sqlx::query("DELETE FROM driver_locations WHERE driver_id = $1")
            .bind(driver)
            .execute(&pool)
            .await
            .unwrap();
    }
}
