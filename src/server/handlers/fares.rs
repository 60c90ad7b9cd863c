use axum::extract::{Extension, Json};

use crate::api::{DynAPI, EstimateFare};
use crate::error::Error;
use crate::fare::FareQuote;

pub async fn estimate(
    Extension(api): Extension<DynAPI>,
    Json(request): Json<EstimateFare>,
) -> Result<Json<FareQuote>, Error> {
    let quote = api.estimate_fare(request).await?;

    Ok(quote.into())
}
