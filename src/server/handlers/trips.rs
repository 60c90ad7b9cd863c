use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{CreateTrip, DynAPI};
use crate::auth::User;
use crate::entities::Trip;
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct ReassignParams {
    driver_id: Uuid,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Json(params): Json<CreateTrip>,
) -> Result<Json<Trip>, Error> {
    let trip = api.create_trip(user, params).await?;

    Ok(trip.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, Error> {
    let trip = api.find_trip(user, id).await?;

    Ok(trip.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, Error> {
    let trip = api.accept_trip(user, id).await?;

    Ok(trip.into())
}

pub async fn arrived(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, Error> {
    let trip = api.mark_arrived(user, id).await?;

    Ok(trip.into())
}

pub async fn start(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, Error> {
    let trip = api.start_trip(user, id).await?;

    Ok(trip.into())
}

pub async fn end(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, Error> {
    let trip = api.end_trip(user, id).await?;

    Ok(trip.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, Error> {
    let trip = api.cancel_trip(user, id).await?;

    Ok(trip.into())
}

pub async fn reassign(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(params): Json<ReassignParams>,
) -> Result<Json<Trip>, Error> {
    let trip = api.reassign_trip(user, id, params.driver_id).await?;

    Ok(trip.into())
}
