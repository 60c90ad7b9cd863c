use super::Engine;

use async_trait::async_trait;

use crate::{
    api::{EstimateFare, FareAPI},
    error::{invalid_input_error, Error},
    fare::FareQuote,
};

#[async_trait]
impl FareAPI for Engine {
    /// Direct estimates win when the client already resolved the route
    /// (mobile apps usually have); otherwise fall through to the routing
    /// provider chain.
    #[tracing::instrument(skip(self))]
    async fn estimate_fare(&self, request: EstimateFare) -> Result<FareQuote, Error> {
        if let (Some(distance_km), Some(duration_min)) =
            (request.distance_km, request.duration_min)
        {
            return Ok(self.estimator.quote(distance_km, duration_min));
        }

        match (request.origin, request.destination) {
            (Some(origin), Some(destination)) => {
                self.estimator.estimate_from_route(origin, destination).await
            }
            _ => Err(invalid_input_error()),
        }
    }
}
