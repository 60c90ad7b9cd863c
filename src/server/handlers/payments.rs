use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::Payment;
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    reference: Option<String>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Payment>, Error> {
    let payment = api.create_payment(user, id, params.reference).await?;

    Ok(payment.into())
}
