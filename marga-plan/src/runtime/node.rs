//! The planning node: periodic tick orchestration.
//!
//! One tick: snapshot perception, reroute when needed, window the route
//! into a reference line, run the maneuver decision, run the lattice
//! planner and publish the result. A tick never propagates an error to the
//! consumer: on invalid input or route failure the previous trajectory is
//! kept, on planning failure the emergency stop profile is emitted.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::context::PlanningContext;
use super::registry::PerceptionRegistry;
use crate::config::PlanningConfig;
use crate::core::Trajectory;
use crate::error::{PlanningError, Result};
use crate::io::messages::Pose;
use crate::io::route::{RouteRequest, RouteResponse, RouteService};
use crate::lattice::FrenetLatticePlanner;
use crate::maneuver::{DecisionContext, ManeuverPlanner, ManeuverState};
use crate::reference::{ReferenceLine, WayPoint};

/// Distance kept behind the ego when windowing route waypoints into a
/// reference line.
const BACKWARD_WINDOW: f64 = 30.0;

pub struct PlanningNode {
    config: PlanningConfig,
    route_service: Box<dyn RouteService>,
    registry: Arc<PerceptionRegistry>,
    maneuver: ManeuverPlanner,
    pool: Option<rayon::ThreadPool>,
    route: Option<RouteResponse>,
    destination: Pose,
    last_trajectory: Trajectory,
    cancel: Arc<AtomicBool>,
}

impl PlanningNode {
    pub fn new(
        config: PlanningConfig,
        route_service: Box<dyn RouteService>,
        registry: Arc<PerceptionRegistry>,
        destination: Pose,
    ) -> Result<Self> {
        config.validate()?;
        let pool = if config.runtime.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.runtime.threads)
                .build()
                .map_err(|e| PlanningError::Config(format!("worker pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            config,
            route_service,
            registry,
            maneuver: ManeuverPlanner::new(),
            pool,
            route: None,
            destination,
            last_trajectory: Trajectory::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn registry(&self) -> Arc<PerceptionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn maneuver_state(&self) -> ManeuverState {
        self.maneuver.state()
    }

    pub fn last_trajectory(&self) -> &Trajectory {
        &self.last_trajectory
    }

    /// Cooperative cancellation flag checked by the candidate scan.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run one planning tick. Always returns an emissible trajectory (the
    /// previous one when this tick had to be skipped).
    pub fn tick(&mut self, now: f64) -> Trajectory {
        match self.tick_inner(now) {
            Ok(trajectory) => {
                self.last_trajectory = trajectory.clone();
                trajectory
            }
            Err(PlanningError::InvalidInput(msg)) => {
                log::error!("tick skipped, keeping previous trajectory: {}", msg);
                self.last_trajectory.clone()
            }
            Err(PlanningError::RouteUnavailable(msg)) => {
                log::error!("route unavailable, keeping previous trajectory: {}", msg);
                self.last_trajectory.clone()
            }
            Err(e) => {
                log::error!("tick failed ({}), keeping previous trajectory", e);
                self.last_trajectory.clone()
            }
        }
    }

    fn tick_inner(&mut self, now: f64) -> Result<Trajectory> {
        let snapshot = self.registry.snapshot();
        let ctx = PlanningContext::from_snapshot(&snapshot, &self.config.vehicle)?;
        let ego = ctx.vehicle.kino_dynamic_state();

        if self.need_reroute(ego.x, ego.y) {
            let request = RouteRequest {
                start: Pose {
                    x: ego.x,
                    y: ego.y,
                    z: ego.z,
                    yaw: ego.theta,
                },
                destination: self.destination,
            };
            log::info!("requesting route to ({:.1}, {:.1})", request.destination.x, request.destination.y);
            self.route = Some(self.route_service.route(&request)?);
        }
        let route = self
            .route
            .as_ref()
            .ok_or_else(|| PlanningError::RouteUnavailable("no route".into()))?;

        let resolution = self.config.planning.reference_resolution;
        let window = Self::route_window(
            &route.waypoints,
            ego.x,
            ego.y,
            BACKWARD_WINDOW,
            self.config.planning.max_lookahead_distance,
        );
        let ref_line = Arc::new(ReferenceLine::from_waypoints(&window, resolution)?);
        let ego_sl = ref_line.xy_to_sl(ego.x, ego.y);

        let decision_ctx = DecisionContext {
            ref_line: &ref_line,
            obstacles: &ctx.obstacles,
            traffic_lights: &ctx.traffic_lights,
            ego_sl,
            ego_vel: ego.v,
            ego_length: self.config.vehicle.length,
            planning: &self.config.planning,
            maneuver: &self.config.maneuver,
        };
        let goal = self.maneuver.update(&decision_ctx, &window, resolution);
        log::debug!(
            "maneuver {:?} at s={:.1} v={:.1}",
            goal.decision_type,
            ego_sl.s,
            ego.v
        );

        let init = self.init_point(&ctx, now);
        let planner = FrenetLatticePlanner::new(&self.config, self.pool.is_some());
        let cancel = Arc::clone(&self.cancel);
        match &self.pool {
            Some(pool) => {
                pool.install(|| planner.plan(&init, &goal, &ctx.obstacles, &cancel, now))
            }
            None => planner.plan(&init, &goal, &ctx.obstacles, &cancel, now),
        }
    }

    /// Planning start point: the previous trajectory's point at the current
    /// time when the ego still tracks it (trajectory stitching), otherwise
    /// the measured state. Stitching keeps the acceleration profile
    /// continuous across re-plans.
    fn init_point(
        &self,
        ctx: &PlanningContext,
        now: f64,
    ) -> crate::core::TrajectoryPoint {
        let ego = ctx.vehicle.kino_dynamic_state();
        if !self.last_trajectory.is_empty() {
            let elapsed = now - self.last_trajectory.timestamp;
            if elapsed >= 0.0 {
                let idx = ((elapsed / self.config.planning.delta_t).round() as usize)
                    .min(self.last_trajectory.len() - 1);
                let point = self.last_trajectory.points[idx];
                let deviation = (point.path_point.x - ego.x).powi(2)
                    + (point.path_point.y - ego.y).powi(2);
                if deviation < 2.0 * 2.0 {
                    let mut init = point;
                    init.relative_time = 0.0;
                    return init;
                }
                log::warn!(
                    "ego diverged {:.1} m from the previous plan, restarting from odometry",
                    deviation.sqrt()
                );
            }
        }
        ctx.vehicle.to_trajectory_point()
    }

    fn need_reroute(&self, ego_x: f64, ego_y: f64) -> bool {
        let Some(route) = &self.route else {
            return true;
        };
        // off-route: farther from every waypoint than 1.5 lane widths
        let min_dist2 = route
            .waypoints
            .iter()
            .map(|wp| (wp.x - ego_x).powi(2) + (wp.y - ego_y).powi(2))
            .fold(f64::INFINITY, f64::min);
        let lane_width = route
            .waypoints
            .first()
            .map(|wp| wp.left_lane_width + wp.right_lane_width)
            .unwrap_or(3.5);
        min_dist2 > (1.5 * lane_width).powi(2)
    }

    /// Waypoint window around the ego: `backward` meters behind the
    /// nearest waypoint to `forward` meters ahead.
    fn route_window(
        waypoints: &[WayPoint],
        ego_x: f64,
        ego_y: f64,
        backward: f64,
        forward: f64,
    ) -> Vec<WayPoint> {
        if waypoints.len() < 2 {
            return waypoints.to_vec();
        }
        let nearest = waypoints
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.x - ego_x).powi(2) + (a.y - ego_y).powi(2);
                let db = (b.x - ego_x).powi(2) + (b.y - ego_y).powi(2);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        let mut start = nearest;
        let mut accumulated = 0.0;
        while start > 0 && accumulated < backward {
            let a = &waypoints[start - 1];
            let b = &waypoints[start];
            accumulated += ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
            start -= 1;
        }

        let mut end = nearest;
        accumulated = 0.0;
        while end + 1 < waypoints.len() && accumulated < forward {
            let a = &waypoints[end];
            let b = &waypoints[end + 1];
            accumulated += ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
            end += 1;
        }

        waypoints[start..=end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::messages::{EgoVehicleStatus, ObjectStatus, Odometry, Vector3};
    use crate::io::route::StaticRouteService;
    use crate::reference::WayPoint;

    fn straight_route(length: f64) -> Vec<WayPoint> {
        (0..=(length as usize / 5))
            .map(|i| WayPoint {
                x: i as f64 * 5.0,
                y: 0.0,
                ..WayPoint::default()
            })
            .collect()
    }

    fn node_with_route(length: f64) -> PlanningNode {
        let waypoints = straight_route(length);
        let destination = Pose {
            x: length,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
        };
        let mut config = PlanningConfig::default();
        // debug builds are slow; keep the deadline out of the way
        config.runtime.tick_deadline_ms = 30_000;
        PlanningNode::new(
            config,
            Box::new(StaticRouteService::new(waypoints)),
            Arc::new(PerceptionRegistry::new()),
            destination,
        )
        .unwrap()
    }

    fn publish_ego(registry: &PerceptionRegistry, x: f64, v: f64, stamp: f64) {
        let mut status = EgoVehicleStatus::default();
        status.velocity = v;
        status.header.stamp = stamp;
        registry.update_ego_status(status);
        let mut odometry = Odometry::default();
        // odometry reports the body center; keep the rear axle at x
        odometry.pose.x = x + 1.4;
        registry.update_odometry(odometry);
    }

    #[test]
    fn test_tick_without_messages_keeps_previous_trajectory() {
        let mut node = node_with_route(200.0);
        let trajectory = node.tick(0.0);
        assert!(trajectory.is_empty());
    }

    #[test]
    fn test_tick_plans_on_straight_road() {
        let mut node = node_with_route(500.0);
        publish_ego(&node.registry(), 0.0, 0.0, 0.0);
        let trajectory = node.tick(0.0);
        assert!(!trajectory.is_empty());
        assert!(trajectory.is_time_monotone());
        assert_eq!(node.maneuver_state(), ManeuverState::FollowLane);
        // the published trajectory is retained
        assert_eq!(node.last_trajectory().len(), trajectory.len());
    }

    #[test]
    fn test_tick_emergency_for_blocking_obstacle() {
        let mut node = node_with_route(500.0);
        let registry = node.registry();
        publish_ego(&registry, 50.0, 5.0, 0.0);
        let mut blocker = ObjectStatus::default();
        blocker.id = 1;
        blocker.pose.x = 58.0;
        blocker.dimensions = Vector3 {
            x: 4.0,
            y: 2.0,
            z: 1.5,
        };
        registry.update_objects(vec![blocker]);
        let trajectory = node.tick(0.0);
        assert_eq!(node.maneuver_state(), ManeuverState::EmergencyStop);
        assert!(trajectory.points.iter().all(|p| p.a <= 0.0));
        assert!(trajectory.points.last().unwrap().v == 0.0);
    }

    #[test]
    fn test_route_window_brackets_ego() {
        let waypoints = straight_route(500.0);
        let window = PlanningNode::route_window(&waypoints, 250.0, 0.0, 30.0, 100.0);
        let first = window.first().unwrap();
        let last = window.last().unwrap();
        assert!(first.x <= 220.0 + 1e-9);
        assert!(last.x >= 350.0 - 1e-9);
        assert!(first.x >= 200.0);
        assert!(last.x <= 400.0);
    }
}
