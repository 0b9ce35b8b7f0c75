//! Client for the routing provider that scores candidate stop orders.
//!
//! Every call is one outbound request to the Mapbox Directions API. The optimizer only
//! depends on [`RoutingProvider`], so tests can swap in a deterministic stub.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::optimization::models::{LegSummary, Profile, RouteSummary, Waypoint};
use crate::{Error, Result};

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Total distance, duration and geometry for visiting `waypoints` in the given order.
    async fn route(&self, waypoints: &[Waypoint], profile: Profile) -> Result<RouteSummary>;

    /// Per-leg distance and duration for the given order, one entry per consecutive pair.
    async fn legs(&self, waypoints: &[Waypoint], profile: Profile) -> Result<Vec<LegSummary>>;
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    distance: f64,
    duration: f64,
    geometry: Option<String>,
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: f64,
    duration: f64,
}

#[derive(Clone)]
pub struct MapboxDirections {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MapboxDirections {
    pub fn new(base_url: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn url(&self, waypoints: &[Waypoint], profile: Profile) -> String {
        format!(
            "{}/directions/v5/mapbox/{}/{}",
            self.base_url,
            profile.as_str(),
            coordinate_path(waypoints)
        )
    }

    async fn fetch(
        &self,
        waypoints: &[Waypoint],
        profile: Profile,
        params: &[(&str, &str)],
    ) -> Result<DirectionsRoute> {
        if waypoints.len() < 2 {
            return Err(Error::invalid_input("a route needs at least two waypoints"));
        }

        let response = self
            .client
            .get(self.url(waypoints, profile))
            .query(&[("access_token", self.access_token.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, profile = %profile, stops = waypoints.len(), "directions response");

        match serde_json::from_str::<DirectionsResponse>(&body) {
            Ok(parsed) => first_route(parsed),
            Err(_) if !status.is_success() => Err(Error::provider(
                status.as_u16().to_string(),
                status.canonical_reason().unwrap_or("request failed"),
            )),
            Err(e) => Err(Error::provider("InvalidResponse", e.to_string())),
        }
    }
}

#[async_trait]
impl RoutingProvider for MapboxDirections {
    async fn route(&self, waypoints: &[Waypoint], profile: Profile) -> Result<RouteSummary> {
        let route = self
            .fetch(
                waypoints,
                profile,
                &[("geometries", "polyline6"), ("overview", "full")],
            )
            .await?;
        Ok(RouteSummary {
            distance: route.distance,
            duration: route.duration,
            geometry: route.geometry,
        })
    }

    async fn legs(&self, waypoints: &[Waypoint], profile: Profile) -> Result<Vec<LegSummary>> {
        let route = self
            .fetch(waypoints, profile, &[("overview", "false"), ("steps", "false")])
            .await?;
        Ok(route
            .legs
            .into_iter()
            .map(|leg| LegSummary {
                distance: leg.distance,
                duration: leg.duration,
            })
            .collect())
    }
}

/// `lng,lat;lng,lat;...` as the Directions API expects.
fn coordinate_path(waypoints: &[Waypoint]) -> String {
    waypoints
        .iter()
        .map(|w| format!("{},{}", w.lng, w.lat))
        .collect::<Vec<_>>()
        .join(";")
}

fn first_route(response: DirectionsResponse) -> Result<DirectionsRoute> {
    let code = response.code.unwrap_or_else(|| "Unknown".to_string());
    if code != "Ok" {
        return Err(Error::provider(
            code,
            response.message.unwrap_or_else(|| "no message".to_string()),
        ));
    }
    response.routes.into_iter().next().ok_or(Error::NoRoute)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<DirectionsRoute> {
        first_route(serde_json::from_str(body).expect("valid json"))
    }

    #[test]
    fn coordinates_are_lng_first() {
        let waypoints = vec![Waypoint::new(40.7, -74.0), Waypoint::new(42.36, -71.05)];
        assert_eq!(coordinate_path(&waypoints), "-74,40.7;-71.05,42.36");
    }

    #[test]
    fn url_includes_profile() {
        let client = MapboxDirections::new("https://api.mapbox.com/", "tok", Duration::from_secs(1))
            .expect("client");
        let waypoints = vec![Waypoint::new(0.0, 0.0), Waypoint::new(1.0, 1.0)];
        assert_eq!(
            client.url(&waypoints, Profile::DrivingTraffic),
            "https://api.mapbox.com/directions/v5/mapbox/driving-traffic/0,0;1,1"
        );
    }

    #[test]
    fn parses_first_route_with_legs() {
        let route = parse(
            r#"{
                "code": "Ok",
                "routes": [
                    {"distance": 1200.5, "duration": 300.2, "geometry": "abc",
                     "legs": [{"distance": 700.0, "duration": 200.0}, {"distance": 500.5, "duration": 100.2}]},
                    {"distance": 9999.0, "duration": 9999.0, "legs": []}
                ],
                "waypoints": []
            }"#,
        )
        .expect("route");
        assert_eq!(route.distance, 1200.5);
        assert_eq!(route.duration, 300.2);
        assert_eq!(route.geometry.as_deref(), Some("abc"));
        assert_eq!(route.legs.len(), 2);
    }

    #[test]
    fn non_ok_code_is_a_provider_error() {
        let err = parse(r#"{"code": "NoSegment", "message": "No road near coordinate", "routes": []}"#)
            .expect_err("should fail");
        match err {
            Error::Provider { code, message } => {
                assert_eq!(code, "NoSegment");
                assert_eq!(message, "No road near coordinate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ok_without_routes_is_no_route() {
        assert!(matches!(parse(r#"{"code": "Ok", "routes": []}"#), Err(Error::NoRoute)));
    }

    #[test]
    fn unauthorized_body_without_code_is_rejected() {
        assert!(matches!(
            parse(r#"{"message": "Not Authorized - Invalid Token"}"#),
            Err(Error::Provider { .. })
        ));
    }
}
