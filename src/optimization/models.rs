// src/optimization/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Request structs (public) ---

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Waypoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn coordinates(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    Driving,
    #[default]
    DrivingTraffic,
    Walking,
    Cycling,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Driving => "driving",
            Profile::DrivingTraffic => "driving-traffic",
            Profile::Walking => "walking",
            Profile::Cycling => "cycling",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub profile: Profile,
}

// --- Provider results (internal to the search) ---

/// Totals for one evaluated stop order.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub distance: f64,
    pub duration: f64,
    pub geometry: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegSummary {
    pub distance: f64,
    pub duration: f64,
}

// --- Response structs (public) ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Leg {
    pub from: usize,
    pub to: usize,
    pub distance: f64,
    pub duration: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Savings {
    pub distance_percent: f64,
    pub duration_percent: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub optimized_order: Vec<usize>,
    pub total_distance: f64,
    pub total_duration: f64,
    pub savings: Savings,
    pub legs: Vec<Leg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
}
