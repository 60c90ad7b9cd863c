use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::RoutingConfig;
use crate::entities::Coordinates;
use crate::error::{invalid_input_error, upstream_error, Error};

/// Distance and duration for a driving route, as returned by a provider.
#[derive(Clone, Copy, Debug)]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, Error>;
}

/// Builds the provider chain in priority order: OSRM first, Google
/// Directions second when an API key is configured.
pub fn providers_from_config(config: &RoutingConfig) -> Vec<Box<dyn RoutingProvider>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let mut providers: Vec<Box<dyn RoutingProvider>> = vec![Box::new(OsrmProvider {
        base_url: config.osrm_url.clone(),
        client: client.clone(),
    })];

    if let Some(key) = &config.google_api_key {
        providers.push(Box::new(GoogleDirectionsProvider {
            api_key: key.clone(),
            client,
        }));
    }

    providers
}

pub struct OsrmProvider {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: Option<f64>,
    duration: Option<f64>,
}

#[async_trait]
impl RoutingProvider for OsrmProvider {
    fn name(&self) -> &'static str {
        "osrm"
    }

    #[tracing::instrument(skip(self))]
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, Error> {
        // OSRM takes lng,lat pairs
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false&alternatives=false",
            self.base_url, origin.lng, origin.lat, destination.lng, destination.lat,
        );

        let res = self.client.get(url).send().await?;

        let status_code = res.status().as_u16();

        if status_code >= 400 && status_code < 500 {
            return Err(invalid_input_error());
        } else if status_code != 200 {
            return Err(upstream_error());
        }

        let data: OsrmResponse = res.json().await?;

        let route = data
            .routes
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(upstream_error)?;

        Ok(RouteSummary {
            distance_meters: route.distance.unwrap_or(0.0),
            duration_seconds: route.duration.unwrap_or(0.0),
        })
    }
}

pub struct GoogleDirectionsProvider {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    routes: Option<Vec<DirectionsRoute>>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    legs: Option<Vec<DirectionsLeg>>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: Option<DirectionsValue>,
    duration: Option<DirectionsValue>,
}

#[derive(Debug, Deserialize)]
struct DirectionsValue {
    value: f64,
}

#[async_trait]
impl RoutingProvider for GoogleDirectionsProvider {
    fn name(&self) -> &'static str {
        "google_directions"
    }

    #[tracing::instrument(skip(self))]
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, Error> {
        let res = self
            .client
            .get("https://maps.googleapis.com/maps/api/directions/json")
            .query(&[("key", self.api_key.as_str())])
            .query(&[("origin", format!("{},{}", origin.lat, origin.lng))])
            .query(&[(
                "destination",
                format!("{},{}", destination.lat, destination.lng),
            )])
            .query(&[("mode", "driving")])
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if status_code >= 400 && status_code < 500 {
            return Err(invalid_input_error());
        } else if status_code != 200 {
            return Err(upstream_error());
        }

        let data: DirectionsResponse = res.json().await?;

        if data.status != "OK" {
            return Err(upstream_error());
        }

        let leg = data
            .routes
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|route| route.legs.unwrap_or_default().into_iter().next())
            .ok_or_else(upstream_error)?;

        Ok(RouteSummary {
            distance_meters: leg.distance.map(|d| d.value).unwrap_or(0.0),
            duration_seconds: leg.duration.map(|d| d.value).unwrap_or(0.0),
        })
    }
}
