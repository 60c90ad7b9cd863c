use serde::{Deserialize, Serialize};

use crate::config::FareConfig;
use crate::entities::Coordinates;
use crate::error::{estimation_unavailable_error, Error};
use crate::external::routing::RoutingProvider;

/// A resolved estimate, including the distance and duration it was priced
/// from so clients can display the breakdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FareQuote {
    pub estimated_fare: f64,
    pub distance_km: f64,
    pub duration_min: f64,
    pub currency: String,
}

/// Linear fare model with a minimum, plus a routing-provider chain for
/// callers that only know origin and destination.
pub struct FareEstimator {
    config: FareConfig,
    providers: Vec<Box<dyn RoutingProvider>>,
}

impl FareEstimator {
    pub fn new(config: FareConfig, providers: Vec<Box<dyn RoutingProvider>>) -> Self {
        Self { config, providers }
    }

    /// `max(min_fare, (base + per_km * km + per_min * min) * surge)`,
    /// rounded to two decimal places. Missing or negative inputs count as
    /// zero, which floors the result at `min_fare`.
    pub fn estimate(&self, distance_km: f64, duration_min: f64) -> f64 {
        let km = distance_km.max(0.0);
        let mins = duration_min.max(0.0);

        let raw =
            (self.config.base + self.config.per_km * km + self.config.per_min * mins)
                * self.config.surge;

        round2(raw.max(self.config.min_fare))
    }

    pub fn quote(&self, distance_km: f64, duration_min: f64) -> FareQuote {
        FareQuote {
            estimated_fare: self.estimate(distance_km, duration_min),
            distance_km: distance_km.max(0.0),
            duration_min: duration_min.max(0.0),
            currency: self.config.currency.clone(),
        }
    }

    /// Resolves distance and duration through the provider chain, first
    /// success wins. All providers failing or returning no usable route
    /// yields `estimation_unavailable`.
    #[tracing::instrument(skip(self))]
    pub async fn estimate_from_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<FareQuote, Error> {
        for provider in &self.providers {
            match provider.route(origin, destination).await {
                Ok(summary) => {
                    let distance_km = summary.distance_meters / 1000.0;
                    let duration_min = summary.duration_seconds / 60.0;
                    return Ok(self.quote(distance_km, duration_min));
                }
                Err(err) => {
                    tracing::warn!(
                        provider = provider.name(),
                        code = err.code,
                        "routing provider failed, trying next"
                    );
                }
            }
        }

        Err(estimation_unavailable_error())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::upstream_error;
    use crate::external::routing::RouteSummary;
    use async_trait::async_trait;

    fn estimator(providers: Vec<Box<dyn RoutingProvider>>) -> FareEstimator {
        FareEstimator::new(FareConfig::default(), providers)
    }

    #[test]
    fn short_trip_is_floored_at_min_fare() {
        // 2000 + 500*1 + 50*10 = 3000, floored to 4000
        assert_eq!(estimator(vec![]).estimate(1.0, 10.0), 4000.0);
    }

    #[test]
    fn long_trip_is_priced_by_the_model() {
        // 2000 + 500*10 + 50*30 = 8500
        assert_eq!(estimator(vec![]).estimate(10.0, 30.0), 8500.0);
    }

    #[test]
    fn zero_inputs_yield_min_fare() {
        assert_eq!(estimator(vec![]).estimate(0.0, 0.0), 4000.0);
    }

    #[test]
    fn negative_inputs_are_treated_as_zero() {
        assert_eq!(estimator(vec![]).estimate(-3.0, -20.0), 4000.0);
    }

    #[test]
    fn surge_scales_before_the_floor() {
        let config = FareConfig {
            surge: 2.0,
            ..FareConfig::default()
        };
        let estimator = FareEstimator::new(config, vec![]);

        // (2000 + 500 + 500) * 2 = 6000, above the floor
        assert_eq!(estimator.estimate(1.0, 10.0), 6000.0);
    }

    #[test]
    fn fares_are_rounded_to_two_decimals() {
        let config = FareConfig {
            base: 0.0,
            per_km: 1.0,
            per_min: 0.0,
            surge: 1.0,
            min_fare: 0.0,
            currency: "NGN".into(),
        };
        let estimator = FareEstimator::new(config, vec![]);

        assert_eq!(estimator.estimate(1.0049, 0.0), 1.0);
        // 1.005 sits just below the half in binary, so it rounds down
        assert_eq!(estimator.estimate(1.005, 0.0), 1.0);
        assert_eq!(estimator.estimate(1.0051, 0.0), 1.01);
    }

    struct FixedProvider {
        summary: RouteSummary,
    }

    #[async_trait]
    impl RoutingProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn route(
            &self,
            _origin: Coordinates,
            _destination: Coordinates,
        ) -> Result<RouteSummary, Error> {
            Ok(self.summary)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl RoutingProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn route(
            &self,
            _origin: Coordinates,
            _destination: Coordinates,
        ) -> Result<RouteSummary, Error> {
            Err(upstream_error())
        }
    }

    fn coords() -> (Coordinates, Coordinates) {
        (
            Coordinates {
                lat: 6.5244,
                lng: 3.3792,
            },
            Coordinates {
                lat: 6.4275,
                lng: 3.4721,
            },
        )
    }

    #[tokio::test]
    async fn falls_through_to_the_next_provider() {
        let estimator = estimator(vec![
            Box::new(FailingProvider),
            Box::new(FixedProvider {
                summary: RouteSummary {
                    distance_meters: 2000.0,
                    duration_seconds: 600.0,
                },
            }),
        ]);

        let (origin, destination) = coords();
        let quote = estimator.estimate_from_route(origin, destination).await.unwrap();

        // 2 km, 10 min -> 2000 + 1000 + 500 = 3500, floored to 4000
        assert_eq!(quote.estimated_fare, 4000.0);
        assert_eq!(quote.distance_km, 2.0);
        assert_eq!(quote.duration_min, 10.0);
        assert_eq!(quote.currency, "NGN");
    }

    #[tokio::test]
    async fn all_providers_failing_is_estimation_unavailable() {
        let estimator = estimator(vec![Box::new(FailingProvider), Box::new(FailingProvider)]);

        let (origin, destination) = coords();
        let err = estimator
            .estimate_from_route(origin, destination)
            .await
            .unwrap_err();

        assert_eq!(err.code, 103);
    }

    #[tokio::test]
    async fn empty_provider_chain_is_estimation_unavailable() {
        let (origin, destination) = coords();
        let err = estimator(vec![])
            .estimate_from_route(origin, destination)
            .await
            .unwrap_err();

        assert_eq!(err.code, 103);
    }
}
