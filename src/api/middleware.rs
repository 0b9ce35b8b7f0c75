use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use std::net::{IpAddr, SocketAddr};

use crate::api::models::ErrorResponse;
use crate::api::routes::AppState;

const ANONYMOUS_CLIENT: &str = "anonymous";

pub async fn rate_limit(State(app_state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(request.headers(), peer_ip(&request));
    if !app_state.rate_limiter.check_and_consume(&key).await {
        tracing::warn!(client = %key, "rate limit exceeded");
        let body = ErrorResponse::new("Too many requests", Some("RATE_LIMITED"));
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }
    next.run(request).await
}

/// Peer address recorded by `into_make_service_with_connect_info`, absent when the
/// router is driven without a listener.
pub(crate) fn peer_ip<B>(request: &axum::http::Request<B>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// First `X-Forwarded-For` hop, else `X-Real-IP`, else the peer IP.
pub(crate) fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    forwarded
        .filter(|v| !v.is_empty())
        .or(real_ip.filter(|v| !v.is_empty()))
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}
