//! Ingress message types.
//!
//! These mirror the wire format of the perception and vehicle stacks; the
//! planner consumes them through [`crate::runtime::PerceptionRegistry`]
//! snapshots. The egress side is [`crate::core::Trajectory`].

use serde::{Deserialize, Serialize};

use crate::core::TrajectoryPoint;

/// Message header carrying the source timestamp in seconds.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Header {
    pub stamp: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// World pose with planar yaw.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct VehicleControl {
    pub steer_percentage: f64,
    pub reverse: bool,
}

/// Ego drive-train status.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EgoVehicleStatus {
    pub header: Header,
    /// Forward speed [m/s]
    pub velocity: f64,
    /// Acceleration in world axes [m/s²]
    pub acceleration: Vector3,
    pub control: VehicleControl,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct WheelInfo {
    /// Position in the vehicle frame
    pub position: Vector3,
    pub max_steer_angle: f64,
}

/// Static ego vehicle description.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EgoVehicleInfo {
    /// Front-left, front-right, rear-left, rear-right
    pub wheels: Vec<WheelInfo>,
    pub center_of_mass: Vector3,
}

/// Ego odometry.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Odometry {
    pub header: Header,
    pub pose: Pose,
    pub twist: Twist,
}

/// A perceived dynamic object with its predicted motion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectStatus {
    pub id: i32,
    pub pose: Pose,
    pub twist: Twist,
    /// Bounding box dimensions: length, width, height
    pub dimensions: Vector3,
    /// Predicted trajectory ordered by `relative_time`; may be empty
    pub prediction: Vec<TrajectoryPoint>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficLightState {
    Red,
    Yellow,
    Green,
    #[default]
    Unknown,
}

/// Traffic light observation with the stop line it guards.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TrafficLightStatus {
    pub id: i32,
    pub state: TrafficLightState,
    pub stop_line: Pose,
}
