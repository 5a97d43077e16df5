//! Route service interface.
//!
//! The global router lives outside this stack; the planner only issues
//! reroute requests and consumes waypoint sequences.

use serde::{Deserialize, Serialize};

use super::messages::Pose;
use crate::error::{PlanningError, Result};
use crate::reference::WayPoint;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Pose,
    pub destination: Pose,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RouteResponse {
    pub waypoints: Vec<WayPoint>,
}

/// Blocking route query. Called from the tick thread when a reroute
/// trigger fires; failures skip the tick (the previous trajectory is kept).
pub trait RouteService: Send + Sync {
    fn route(&self, request: &RouteRequest) -> Result<RouteResponse>;
}

/// Route service returning a fixed waypoint sequence. Used by the simulated
/// node and the scenario tests.
pub struct StaticRouteService {
    response: RouteResponse,
}

impl StaticRouteService {
    pub fn new(waypoints: Vec<WayPoint>) -> Self {
        Self {
            response: RouteResponse { waypoints },
        }
    }
}

impl RouteService for StaticRouteService {
    fn route(&self, _request: &RouteRequest) -> Result<RouteResponse> {
        if self.response.waypoints.is_empty() {
            return Err(PlanningError::RouteUnavailable(
                "static route is empty".into(),
            ));
        }
        Ok(self.response.clone())
    }
}
