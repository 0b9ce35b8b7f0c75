use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{classify::ServerErrorsFailureClass, cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers::*;
use crate::api::middleware::{client_key, peer_ip, rate_limit};
use crate::config::Config;
use crate::directions::{MapboxDirections, RoutingProvider};
use crate::optimization::RouteOptimizer;
use crate::rate_limiter::{FixedWindowLimiter, NoopLimiter, RateLimiter};
use crate::Result;

#[derive(Clone)]
pub struct AppState {
    pub optimizer: RouteOptimizer,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn new(optimizer: RouteOptimizer, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        AppState {
            optimizer,
            rate_limiter,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let provider: Option<Arc<dyn RoutingProvider>> = match &config.mapbox_access_token {
            Some(token) => {
                let client =
                    MapboxDirections::new(&config.mapbox_api_url, token, config.directions_timeout)?;
                Some(Arc::new(client) as Arc<dyn RoutingProvider>)
            }
            None => None,
        };

        Ok(AppState::new(
            RouteOptimizer::new(provider),
            build_rate_limiter(config)?,
        ))
    }
}

fn build_rate_limiter(config: &Config) -> Result<Arc<dyn RateLimiter>> {
    if !config.rate_limit.is_enabled() {
        return Ok(Arc::new(NoopLimiter));
    }

    #[cfg(feature = "redis")]
    {
        if let Some(url) = &config.redis_url {
            use crate::rate_limiter::RedisFixedWindowLimiter;
            tracing::info!("rate limiting through redis");
            let limiter =
                RedisFixedWindowLimiter::new(url, "route-optimizer:ratelimit", config.rate_limit)?;
            return Ok(Arc::new(limiter));
        }
    }

    #[cfg(not(feature = "redis"))]
    {
        if config.redis_url.is_some() {
            tracing::warn!("REDIS_URL set but built without the `redis` feature, limiting in memory");
        }
    }

    Ok(Arc::new(FixedWindowLimiter::new(config.rate_limit)))
}

pub fn create_router(state: AppState) -> Router {
    let optimize_routes: Router<AppState> = Router::new()
        .route("/api/directions/optimize", post(optimize_route))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health_check))
        .merge(optimize_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        client = %client_key(request.headers(), peer_ip(request)),
                        outcome = tracing::field::Empty,
                        code = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<_>, _span: &tracing::Span| {
                    tracing::debug!("started");
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            status = response.status().as_u16(),
                            latency_ms = latency.as_millis() as u64,
                            "finished"
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::error!(
                            %error,
                            latency_ms = latency.as_millis() as u64,
                            "failed"
                        );
                    },
                ),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
