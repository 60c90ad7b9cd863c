use super::Database;

use sqlx::{types::Json, Executor, Pool, Row, Transaction};
use uuid::Uuid;

use crate::{
    entities::Trip,
    error::{not_found_error, Error},
};

#[tracing::instrument(skip(tx))]
pub async fn fetch_trip_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Trip, Error> {
    let Json(trip): Json<Trip> = tx
        .fetch_optional(sqlx::query("SELECT data FROM trips WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(not_found_error)?
        .try_get("data")?;

    Ok(trip)
}

#[tracing::instrument(skip(pool))]
pub async fn fetch_trip(pool: &Pool<Database>, id: &Uuid) -> Result<Trip, Error> {
    let Json(trip): Json<Trip> = pool
        .acquire()
        .await?
        .fetch_optional(sqlx::query("SELECT data FROM trips WHERE id = $1").bind(id))
        .await?
        .ok_or_else(not_found_error)?
        .try_get("data")?;

    Ok(trip)
}

/// Degraded-mode share resolution: match the token stored on the trip row.
/// End and cancel clear that field, so revoked tokens stop matching.
#[tracing::instrument(skip(pool, token))]
pub async fn fetch_trip_by_share_token(
    pool: &Pool<Database>,
    token: &str,
) -> Result<Trip, Error> {
    let Json(trip): Json<Trip> = pool
        .acquire()
        .await?
        .fetch_optional(
            sqlx::query("SELECT data FROM trips WHERE data->>'share_token' = $1").bind(token),
        )
        .await?
        .ok_or_else(not_found_error)?
        .try_get("data")?;

    Ok(trip)
}

#[tracing::instrument(skip(pool))]
pub async fn insert_trip(pool: &Pool<Database>, trip: &Trip) -> Result<(), Error> {
    pool.acquire()
        .await?
        .execute(
            sqlx::query("INSERT INTO trips (id, status, data) VALUES ($1, $2, $3)")
                .bind(trip.id)
                .bind(trip.status.name())
                .bind(Json(trip)),
        )
        .await?;

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn update_trip(tx: &mut Transaction<'_, Database>, trip: &Trip) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE trips SET status = $2, data = $3 WHERE id = $1")
            .bind(trip.id)
            .bind(trip.status.name())
            .bind(Json(trip)),
    )
    .await?;

    Ok(())
}
