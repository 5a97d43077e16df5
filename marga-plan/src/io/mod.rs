//! Message types and external service interfaces.

pub mod messages;
pub mod route;

pub use messages::{
    EgoVehicleInfo, EgoVehicleStatus, Header, ObjectStatus, Odometry, Pose, TrafficLightState,
    TrafficLightStatus,
};
pub use route::{RouteRequest, RouteResponse, RouteService, StaticRouteService};
