use super::helpers::{fetch_trip, fetch_trip_by_share_token};
use super::Engine;

use async_trait::async_trait;

use crate::{
    api::{ShareAPI, SharedDriverView, SharedTripView},
    entities::Coordinates,
    error::Error,
};

#[async_trait]
impl ShareAPI for Engine {
    #[tracing::instrument(skip(self, token))]
    async fn resolve_share_token(&self, token: String) -> Result<SharedTripView, Error> {
        // Fast-path reverse lookup, then the trip row itself. Tokens issued
        // while Redis was down only exist on the row.
        let trip = match self.share_links.resolve(&token).await {
            Some(trip_id) => fetch_trip(&self.pool, &trip_id).await?,
            None => fetch_trip_by_share_token(&self.pool, &token).await?,
        };

        let driver = match trip.driver_id {
            Some(driver_id) => {
                let name = self.directory.display_name(driver_id).await;
                let location = self.geo.latest_for(driver_id).await?;

                Some(SharedDriverView {
                    id: driver_id,
                    name,
                    location: location.as_ref().map(|l| Coordinates {
                        lat: l.lat,
                        lng: l.lng,
                    }),
                    updated_at: location.map(|l| l.updated_at),
                })
            }
            None => None,
        };

        Ok(SharedTripView {
            trip_id: trip.id,
            status: trip.status.name().to_string(),
            origin: trip.origin,
            destination: trip.destination,
            driver,
        })
    }
}
