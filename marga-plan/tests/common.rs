//! Shared scenario builders for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use marga_plan::config::PlanningConfig;
use marga_plan::core::Trajectory;
use marga_plan::io::messages::{EgoVehicleStatus, ObjectStatus, Odometry, Pose, Vector3};
use marga_plan::io::route::StaticRouteService;
use marga_plan::reference::{LaneChange, WayPoint};
use marga_plan::runtime::{PerceptionRegistry, PlanningNode};

/// Default config with a test-friendly deadline (debug builds are slow).
pub fn test_config() -> PlanningConfig {
    let mut config = PlanningConfig::default();
    config.runtime.tick_deadline_ms = 30_000;
    config
}

/// Straight route along +x with one waypoint every 5 m.
pub fn straight_route(length: f64, lane_change: LaneChange) -> Vec<WayPoint> {
    (0..=(length as usize / 5))
        .map(|i| WayPoint {
            x: i as f64 * 5.0,
            y: 0.0,
            lane_change,
            has_left_lane: lane_change.allows_left(),
            has_right_lane: lane_change.allows_right(),
            ..WayPoint::default()
        })
        .collect()
}

pub fn make_node(route: Vec<WayPoint>, config: PlanningConfig) -> PlanningNode {
    let destination = route
        .last()
        .map(|wp| Pose {
            x: wp.x,
            y: wp.y,
            z: 0.0,
            yaw: wp.theta,
        })
        .unwrap_or_default();
    PlanningNode::new(
        config,
        Box::new(StaticRouteService::new(route)),
        Arc::new(PerceptionRegistry::new()),
        destination,
    )
    .expect("node construction")
}

/// A car-sized perception object.
pub fn vehicle_object(id: i32, x: f64, y: f64, vx: f64) -> ObjectStatus {
    let mut object = ObjectStatus::default();
    object.id = id;
    object.pose.x = x;
    object.pose.y = y;
    object.twist.linear.x = vx;
    object.dimensions = Vector3 {
        x: 4.0,
        y: 2.0,
        z: 1.5,
    };
    object
}

/// Publish ego messages for a rear-axle position.
pub fn publish_ego(registry: &PerceptionRegistry, x: f64, y: f64, yaw: f64, v: f64, stamp: f64) {
    let mut status = EgoVehicleStatus::default();
    status.velocity = v;
    status.header.stamp = stamp;
    registry.update_ego_status(status);
    let mut odometry = Odometry::default();
    odometry.pose.x = x + 1.4 * yaw.cos();
    odometry.pose.y = y + 1.4 * yaw.sin();
    odometry.pose.yaw = yaw;
    registry.update_odometry(odometry);
}

/// Closed-loop simulation: the ego tracks each plan's next point exactly;
/// obstacles are re-published from `objects_at` every tick. Returns every
/// emitted trajectory.
pub fn run_sim(
    node: &mut PlanningNode,
    start: (f64, f64, f64, f64),
    objects_at: impl Fn(f64) -> Vec<ObjectStatus>,
    ticks: usize,
    delta_t: f64,
) -> Vec<Trajectory> {
    let registry = node.registry();
    let (mut x, mut y, mut yaw, mut v) = start;
    let mut trajectories = Vec::with_capacity(ticks);
    for tick in 0..ticks {
        let now = tick as f64 * delta_t;
        publish_ego(&registry, x, y, yaw, v, now);
        registry.update_objects(objects_at(now));
        let trajectory = node.tick(now);
        if let Some(next) = trajectory.points.get(1) {
            x = next.path_point.x;
            y = next.path_point.y;
            yaw = next.path_point.theta;
            v = next.v;
        }
        trajectories.push(trajectory);
    }
    trajectories
}
