use axum::extract::{Extension, Json};

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::LocationPing;
use crate::error::Error;

pub async fn update_location(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Json(ping): Json<LocationPing>,
) -> Result<Json<()>, Error> {
    api.update_driver_location(user, ping).await?;

    Ok(().into())
}

pub async fn logout(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
) -> Result<Json<()>, Error> {
    api.driver_logout(user).await?;

    Ok(().into())
}
