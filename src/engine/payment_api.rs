use super::helpers::fetch_trip;
use super::Engine;

use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    api::PaymentAPI,
    auth::User,
    entities::Payment,
    error::{forbidden_error, Error},
};

#[async_trait]
impl PaymentAPI for Engine {
    /// Seeds a charge record from the trip's price; the frontend takes the
    /// returned reference to the payment provider's checkout. Provider
    /// initialization and webhooks are handled outside this service.
    #[tracing::instrument(skip(self))]
    async fn create_payment(
        &self,
        user: User,
        trip_id: Uuid,
        reference: Option<String>,
    ) -> Result<Payment, Error> {
        let trip = fetch_trip(&self.pool, &trip_id).await?;

        if user.id != trip.customer_id && !user.is_admin() {
            return Err(forbidden_error());
        }

        let amount = match trip.price {
            Some(price) => price,
            None => match (trip.distance_km, trip.duration_min) {
                (Some(distance_km), Some(duration_min)) => {
                    self.estimator.estimate(distance_km, duration_min)
                }
                _ => 0.0,
            },
        };

        let reference = reference.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let payment = Payment::new(trip.id, amount, reference);

        sqlx::query("INSERT INTO payments (id, reference, status, data) VALUES ($1, $2, $3, $4)")
            .bind(payment.id)
            .bind(&payment.reference)
            .bind(payment.status.name())
            .bind(Json(&payment))
            .execute(&self.pool)
            .await?;

        Ok(payment)
    }
}
