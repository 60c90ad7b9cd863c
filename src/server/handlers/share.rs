use axum::extract::{Extension, Json, Path};

use crate::api::{DynAPI, SharedTripView};
use crate::error::Error;

pub async fn resolve(
    Extension(api): Extension<DynAPI>,
    Path(token): Path<String>,
) -> Result<Json<SharedTripView>, Error> {
    let view = api.resolve_share_token(token).await?;

    Ok(view.into())
}
