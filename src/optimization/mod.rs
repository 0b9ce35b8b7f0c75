//! Stop-order optimization.
//!
//! The search always starts from the order the caller submitted. For up to
//! [`MAX_BRUTE_FORCE_INTERIOR`] interior stops every ordering is scored by the routing
//! provider; above that a single nearest-neighbor ordering is tried. A candidate only
//! replaces the incumbent when it is strictly faster, so ties keep the earlier
//! (lexicographically smaller) order and the answer is never slower than the input.

pub mod models;
mod services;

use std::sync::Arc;
use thiserror::Error as ThisError;

use crate::directions::RoutingProvider;
use crate::geo::is_valid_coordinate;

pub use models::{
    Leg, LegSummary, OptimizationResult, OptimizeRequest, Profile, RouteSummary, Savings,
    Waypoint,
};
pub use services::{
    nearest_neighbor_order, permutations, savings_percent, with_endpoints, Permutations,
};

pub const MIN_WAYPOINTS: usize = 2;
pub const MAX_WAYPOINTS: usize = 25;
pub const MAX_BRUTE_FORCE_INTERIOR: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
    #[error("At least 2 waypoints are required")]
    TooFewWaypoints,
    #[error("Maximum 25 waypoints supported")]
    TooManyWaypoints,
    #[error("Invalid coordinates for waypoint {0}")]
    InvalidCoordinates(usize),
}

impl ValidationError {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ValidationError::TooFewWaypoints => None,
            ValidationError::TooManyWaypoints => Some("TOO_MANY_WAYPOINTS"),
            ValidationError::InvalidCoordinates(_) => Some("INVALID_COORDINATES"),
        }
    }
}

/// Why no optimized order was produced. The caller is expected to fall back to its own
/// straight-line estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    NotConfigured,
    BaselineFailed(String),
    Exception(String),
}

impl FallbackReason {
    pub fn message(&self) -> &'static str {
        match self {
            FallbackReason::NotConfigured => "Mapbox API not configured",
            FallbackReason::BaselineFailed(_) => "Could not calculate route",
            FallbackReason::Exception(_) => "Failed to optimize route",
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            FallbackReason::NotConfigured => Some("API_NOT_CONFIGURED"),
            FallbackReason::BaselineFailed(_) => None,
            FallbackReason::Exception(_) => Some("EXCEPTION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptimizationOutcome {
    Optimized(OptimizationResult),
    Fallback(FallbackReason),
    Rejected(ValidationError),
}

impl OptimizationOutcome {
    /// Short name for logs and trace spans.
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizationOutcome::Optimized(_) => "optimized",
            OptimizationOutcome::Fallback(_) => "fallback",
            OptimizationOutcome::Rejected(_) => "rejected",
        }
    }

    /// Machine-readable code carried in the response body, if any.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            OptimizationOutcome::Optimized(_) => None,
            OptimizationOutcome::Fallback(reason) => reason.code(),
            OptimizationOutcome::Rejected(err) => err.code(),
        }
    }
}

pub fn validate_waypoints(waypoints: &[Waypoint]) -> Result<(), ValidationError> {
    if waypoints.len() < MIN_WAYPOINTS {
        return Err(ValidationError::TooFewWaypoints);
    }
    if waypoints.len() > MAX_WAYPOINTS {
        return Err(ValidationError::TooManyWaypoints);
    }
    match waypoints
        .iter()
        .position(|w| !is_valid_coordinate(w.lat, w.lng))
    {
        Some(index) => Err(ValidationError::InvalidCoordinates(index)),
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct RouteOptimizer {
    provider: Option<Arc<dyn RoutingProvider>>,
}

impl RouteOptimizer {
    pub fn new(provider: Option<Arc<dyn RoutingProvider>>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn optimize(&self, request: &OptimizeRequest) -> OptimizationOutcome {
        if let Err(e) = validate_waypoints(&request.waypoints) {
            tracing::info!(waypoints = request.waypoints.len(), "rejected optimize request: {e}");
            return OptimizationOutcome::Rejected(e);
        }

        let Some(provider) = self.provider.as_deref() else {
            tracing::warn!("routing provider not configured, asking client to fall back");
            return OptimizationOutcome::Fallback(FallbackReason::NotConfigured);
        };

        Search {
            provider,
            waypoints: &request.waypoints,
            profile: request.profile,
        }
        .run()
        .await
    }
}

struct Candidate {
    order: Vec<usize>,
    route: RouteSummary,
}

struct Search<'a> {
    provider: &'a dyn RoutingProvider,
    waypoints: &'a [Waypoint],
    profile: Profile,
}

impl Search<'_> {
    async fn run(&self) -> OptimizationOutcome {
        let count = self.waypoints.len();
        let last = count - 1;

        tracing::debug!(stage = "baseline-evaluation", waypoints = count, profile = %self.profile);
        let baseline = match self.provider.route(self.waypoints, self.profile).await {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!("baseline route failed, asking client to fall back: {e}");
                return OptimizationOutcome::Fallback(FallbackReason::BaselineFailed(e.to_string()));
            }
        };

        let mut best = Candidate {
            order: (0..count).collect(),
            route: baseline.clone(),
        };
        let interior: Vec<usize> = (1..last).collect();

        if interior.is_empty() {
            let legs = vec![Leg {
                from: 0,
                to: last,
                distance: baseline.distance,
                duration: baseline.duration,
            }];
            return OptimizationOutcome::Optimized(finish(&baseline, best, legs));
        }

        if interior.len() <= MAX_BRUTE_FORCE_INTERIOR {
            tracing::debug!(stage = "candidate-search", strategy = "permutations", interior = interior.len());
            for permutation in permutations(&interior) {
                self.consider(&mut best, with_endpoints(0, &permutation, last))
                    .await;
            }
        } else {
            tracing::debug!(stage = "candidate-search", strategy = "nearest-neighbor", interior = interior.len());
            self.consider(&mut best, nearest_neighbor_order(self.waypoints, 0, last))
                .await;
        }

        tracing::debug!(stage = "leg-breakdown", order = ?best.order);
        let legs = self.leg_breakdown(&best.order).await;
        let result = finish(&baseline, best, legs);
        tracing::info!(
            waypoints = count,
            duration_savings = result.savings.duration_percent,
            distance_savings = result.savings.distance_percent,
            "route optimized"
        );
        OptimizationOutcome::Optimized(result)
    }

    fn ordered(&self, order: &[usize]) -> Vec<Waypoint> {
        order.iter().map(|&i| self.waypoints[i].clone()).collect()
    }

    /// Scores `order` and keeps it when strictly faster than the incumbent. Provider
    /// failures disqualify the candidate and nothing more.
    async fn consider(&self, best: &mut Candidate, order: Vec<usize>) {
        match self.provider.route(&self.ordered(&order), self.profile).await {
            Ok(route) => {
                tracing::debug!(order = ?order, duration = route.duration, "candidate scored");
                if route.duration < best.route.duration {
                    *best = Candidate { order, route };
                }
            }
            Err(e) => {
                tracing::warn!(order = ?order, "candidate route failed, skipping: {e}");
            }
        }
    }

    async fn leg_breakdown(&self, order: &[usize]) -> Vec<Leg> {
        let summaries = match self.provider.legs(&self.ordered(order), self.profile).await {
            Ok(summaries) => summaries,
            Err(e) => {
                tracing::warn!("leg breakdown failed, returning route without legs: {e}");
                return Vec::new();
            }
        };
        if summaries.len() + 1 != order.len() {
            tracing::warn!(
                expected = order.len() - 1,
                got = summaries.len(),
                "leg count does not match stop count"
            );
        }
        order
            .windows(2)
            .zip(summaries)
            .map(|(pair, leg)| Leg {
                from: pair[0],
                to: pair[1],
                distance: leg.distance,
                duration: leg.duration,
            })
            .collect()
    }
}

fn finish(baseline: &RouteSummary, best: Candidate, legs: Vec<Leg>) -> OptimizationResult {
    OptimizationResult {
        savings: Savings {
            distance_percent: savings_percent(baseline.distance, best.route.distance),
            duration_percent: savings_percent(baseline.duration, best.route.duration),
        },
        total_distance: best.route.distance,
        total_duration: best.route.duration,
        geometry: best.route.geometry,
        optimized_order: best.order,
        legs,
    }
}
