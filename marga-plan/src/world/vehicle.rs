//! Ego vehicle state assembled from drive-train status and odometry.
//!
//! The kinematic reference point is the rear axle center; bounding boxes are
//! shifted forward by `back_axle_to_center_length` where needed.

use crate::config::VehicleParams;
use crate::core::{Box2d, KinoDynamicState, TrajectoryPoint, Vec2};
use crate::io::messages::{EgoVehicleInfo, EgoVehicleStatus, Odometry};

/// Derived ego geometry. Comes from the vehicle info message when one is
/// available, otherwise from configuration.
#[derive(Clone, Copy, Debug)]
pub struct VehicleGeometry {
    pub length: f64,
    pub width: f64,
    pub back_axle_to_center_length: f64,
    pub max_steer_angle: f64,
    /// Minimum turning radius from wheelbase and steering limit
    pub min_turn_radius: f64,
}

impl VehicleGeometry {
    pub fn from_params(params: &VehicleParams) -> Self {
        Self {
            length: params.length,
            width: params.width,
            back_axle_to_center_length: params.back_axle_to_center_length,
            max_steer_angle: 1.0,
            min_turn_radius: 2.0 * params.back_axle_to_center_length,
        }
    }

    /// Merge wheel geometry from the vehicle info message. Wheel order is
    /// front-left, front-right, rear-left, rear-right.
    pub fn with_info(mut self, info: &EgoVehicleInfo) -> Self {
        if info.wheels.len() < 4 {
            return self;
        }
        let front_x = 0.5 * (info.wheels[0].position.x + info.wheels[1].position.x);
        let rear_x = 0.5 * (info.wheels[2].position.x + info.wheels[3].position.x);
        let axle_length = (front_x - rear_x).abs();
        self.back_axle_to_center_length = (rear_x - info.center_of_mass.x).abs();
        self.max_steer_angle =
            0.5 * (info.wheels[0].max_steer_angle + info.wheels[1].max_steer_angle);
        if self.max_steer_angle.tan().abs() > 1e-6 {
            self.min_turn_radius = axle_length / self.max_steer_angle.tan();
        }
        self
    }
}

/// Full ego state for one tick.
#[derive(Clone, Debug)]
pub struct VehicleState {
    state: KinoDynamicState,
    geometry: VehicleGeometry,
    timestamp: f64,
    steer_percentage: f64,
    reverse: bool,
}

impl VehicleState {
    /// Assemble from the latest status and odometry messages. Slip angle is
    /// assumed zero, so the velocity heading equals the body heading and
    /// curvature follows from yaw rate over speed.
    pub fn from_messages(
        status: &EgoVehicleStatus,
        odometry: &Odometry,
        geometry: VehicleGeometry,
    ) -> Self {
        let theta = odometry.pose.yaw;
        // odometry pose is the body center; plan from the rear axle
        let x = odometry.pose.x - geometry.back_axle_to_center_length * theta.cos();
        let y = odometry.pose.y - geometry.back_axle_to_center_length * theta.sin();

        let v = status.velocity;
        let omega = odometry.twist.angular.z;
        let kappa = if v.abs() < 1e-6 { 0.0 } else { omega / v };

        let a = status.acceleration.x * theta.cos() + status.acceleration.y * theta.sin();
        let centripetal_acc =
            -status.acceleration.x * theta.sin() + status.acceleration.y * theta.cos();

        Self {
            state: KinoDynamicState::new(
                x,
                y,
                odometry.pose.z,
                theta,
                kappa,
                v,
                a,
                centripetal_acc,
            ),
            geometry,
            timestamp: status.header.stamp,
            steer_percentage: status.control.steer_percentage,
            reverse: status.control.reverse,
        }
    }

    pub fn kino_dynamic_state(&self) -> &KinoDynamicState {
        &self.state
    }

    pub fn geometry(&self) -> &VehicleGeometry {
        &self.geometry
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn steer_percentage(&self) -> f64 {
        self.steer_percentage
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Ego bounding box at the current state (center shifted forward from
    /// the rear axle).
    pub fn bounding_box(&self) -> Box2d {
        let shift = self.geometry.back_axle_to_center_length;
        let mut ego_box = Box2d::new(
            Vec2::new(self.state.x, self.state.y),
            self.state.theta,
            self.geometry.length,
            self.geometry.width,
        );
        ego_box.shift(Vec2::new(
            shift * self.state.theta.cos(),
            shift * self.state.theta.sin(),
        ));
        ego_box
    }

    /// The planning start point for this tick, as a trajectory point at
    /// time offset zero.
    pub fn to_trajectory_point(&self) -> TrajectoryPoint {
        self.state.to_trajectory_point(0.0)
    }
}
