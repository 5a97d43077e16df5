//! Spatiotemporal collision checking against predicted obstacle boxes.

use rayon::prelude::*;

use crate::config::{PlanningSection, VehicleParams};
use crate::core::{Box2d, Trajectory, Vec2};
use crate::lattice::st_graph::StGraph;
use crate::reference::ReferenceLine;
use crate::world::ObstacleSnapshot;

/// Per-timestep predicted obstacle boxes, inflated by the safety buffers.
/// Index k corresponds to `relative_time = k * delta_t`.
pub type PredictedEnvironment = Vec<Vec<Box2d>>;

/// Collision checker built once per tick.
pub struct CollisionChecker {
    predicted_env: PredictedEnvironment,
    delta_t: f64,
    ego_length: f64,
    ego_width: f64,
    ego_box_shift: f64,
    parallel: bool,
}

impl CollisionChecker {
    /// Project the kept obstacles forward over the lookahead horizon.
    ///
    /// When the ego drives inside the lane, obstacles behind it and
    /// obstacles that never enter the ST graph are skipped.
    pub fn new(
        obstacles: &ObstacleSnapshot,
        st_graph: &StGraph,
        ref_line: &ReferenceLine,
        ego_s: f64,
        ego_d: f64,
        planning: &PlanningSection,
        vehicle: &VehicleParams,
        parallel: bool,
    ) -> Self {
        let (left, right) = ref_line.lane_width(ego_s);
        let ego_in_lane = ego_d < left && ego_d > -right;

        let mut considered = Vec::new();
        for obstacle in obstacles.iter() {
            if ego_in_lane
                && (Self::is_behind_ego(obstacle, ego_s, ref_line)
                    || !st_graph.is_obstacle_in_graph(obstacle.id()))
            {
                continue;
            }
            considered.push(obstacle);
        }

        let mut predicted_env = Vec::new();
        let mut relative_time = 0.0;
        while relative_time < planning.max_lookahead_time {
            let mut boxes = Vec::with_capacity(considered.len());
            for obstacle in &considered {
                let point = obstacle.point_at(relative_time);
                let mut bounding_box = obstacle.bounding_box_at(&point);
                bounding_box.lateral_extend(2.0 * planning.lat_safety_buffer);
                bounding_box.longitudinal_extend(2.0 * planning.lon_safety_buffer);
                boxes.push(bounding_box);
            }
            predicted_env.push(boxes);
            relative_time += planning.delta_t;
        }

        Self {
            predicted_env,
            delta_t: planning.delta_t,
            ego_length: vehicle.length,
            ego_width: vehicle.width,
            ego_box_shift: vehicle.back_axle_to_center_length,
            parallel,
        }
    }

    fn is_behind_ego(
        obstacle: &crate::world::Obstacle,
        ego_s: f64,
        ref_line: &ReferenceLine,
    ) -> bool {
        let point = obstacle.point_at(0.0);
        let sl = ref_line.xy_to_sl(point.path_point.x, point.path_point.y);
        let (left, right) = ref_line.lane_width(sl.s);
        ego_s > sl.s && sl.l < left && sl.l > -right
    }

    pub fn predicted_environment(&self) -> &PredictedEnvironment {
        &self.predicted_env
    }

    /// Test a candidate trajectory against the predicted environment.
    ///
    /// The trajectory must be sampled at the checker's `delta_t`; point k is
    /// tested against environment step k.
    pub fn is_collision(&self, trajectory: &Trajectory) -> bool {
        debug_assert!(
            trajectory
                .points
                .iter()
                .enumerate()
                .all(|(k, p)| (p.relative_time - k as f64 * self.delta_t).abs() < 1e-6),
            "trajectory sampling step does not match the collision checker"
        );

        let steps = trajectory.points.len().min(self.predicted_env.len());
        if self.parallel {
            (0..steps)
                .into_par_iter()
                .any(|k| self.step_collides(trajectory, k))
        } else {
            (0..steps).any(|k| self.step_collides(trajectory, k))
        }
    }

    fn step_collides(&self, trajectory: &Trajectory, k: usize) -> bool {
        let point = &trajectory.points[k];
        let theta = point.path_point.theta;
        let mut ego_box = Box2d::new(
            Vec2::new(point.path_point.x, point.path_point.y),
            theta,
            self.ego_length,
            self.ego_width,
        );
        ego_box.shift(Vec2::new(
            self.ego_box_shift * theta.cos(),
            self.ego_box_shift * theta.sin(),
        ));
        self.predicted_env[k]
            .iter()
            .any(|obstacle_box| ego_box.has_overlap(obstacle_box))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PathPoint, TrajectoryPoint};
    use crate::io::messages::{ObjectStatus, Vector3};
    use crate::reference::WayPoint;

    fn straight_line() -> ReferenceLine {
        let waypoints: Vec<WayPoint> = (0..=20)
            .map(|i| WayPoint {
                x: i as f64 * 5.0,
                y: 0.0,
                ..WayPoint::default()
            })
            .collect();
        ReferenceLine::from_waypoints(&waypoints, 1.0).unwrap()
    }

    fn stopped_obstacle_at(id: i32, x: f64, y: f64) -> ObjectStatus {
        let mut object = ObjectStatus::default();
        object.id = id;
        object.pose.x = x;
        object.pose.y = y;
        object.dimensions = Vector3 {
            x: 4.0,
            y: 2.0,
            z: 1.5,
        };
        object
    }

    fn straight_trajectory(v: f64, steps: usize, delta_t: f64) -> Trajectory {
        let mut trajectory = Trajectory::new(0.0);
        for k in 0..steps {
            let t = k as f64 * delta_t;
            trajectory.points.push(TrajectoryPoint {
                path_point: PathPoint {
                    x: v * t,
                    y: 0.0,
                    ..PathPoint::default()
                },
                v,
                a: 0.0,
                relative_time: t,
            });
        }
        trajectory
    }

    fn checker_for(objects: Vec<ObjectStatus>, parallel: bool) -> CollisionChecker {
        let line = straight_line();
        let snapshot = ObstacleSnapshot::from_objects(&objects);
        let planning = PlanningSection::default();
        let graph = StGraph::build(&snapshot, &line, planning.max_lookahead_time, planning.delta_t);
        CollisionChecker::new(
            &snapshot,
            &graph,
            &line,
            0.0,
            0.0,
            &planning,
            &VehicleParams::default(),
            parallel,
        )
    }

    #[test]
    fn test_drives_into_stopped_vehicle() {
        let checker = checker_for(vec![stopped_obstacle_at(1, 40.0, 0.0)], false);
        let trajectory = straight_trajectory(10.0, 60, 0.1);
        assert!(checker.is_collision(&trajectory));
    }

    #[test]
    fn test_clear_lane_is_collision_free() {
        // obstacle parked far off the lane never enters the checker
        let checker = checker_for(vec![stopped_obstacle_at(1, 40.0, 15.0)], false);
        let trajectory = straight_trajectory(10.0, 60, 0.1);
        assert!(!checker.is_collision(&trajectory));
    }

    #[test]
    fn test_obstacle_behind_ego_is_skipped() {
        let line = straight_line();
        let snapshot = ObstacleSnapshot::from_objects(&[stopped_obstacle_at(1, 10.0, 0.0)]);
        let planning = PlanningSection::default();
        let graph = StGraph::build(&snapshot, &line, planning.max_lookahead_time, planning.delta_t);
        // ego at s = 30, in lane, obstacle at s = 10
        let checker = CollisionChecker::new(
            &snapshot,
            &graph,
            &line,
            30.0,
            0.0,
            &planning,
            &VehicleParams::default(),
            false,
        );
        assert!(checker.predicted_environment()[0].is_empty());
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let objects = vec![
            stopped_obstacle_at(1, 40.0, 0.0),
            stopped_obstacle_at(2, 70.0, 3.0),
        ];
        let fast = straight_trajectory(10.0, 60, 0.1);
        let slow = straight_trajectory(2.0, 60, 0.1);
        assert_eq!(
            checker_for(objects.clone(), false).is_collision(&fast),
            checker_for(objects.clone(), true).is_collision(&fast)
        );
        assert_eq!(
            checker_for(objects.clone(), false).is_collision(&slow),
            checker_for(objects, true).is_collision(&slow)
        );
    }

    #[test]
    fn test_boxes_are_inflated_by_buffers() {
        let checker = checker_for(vec![stopped_obstacle_at(1, 40.0, 0.0)], false);
        let planning = PlanningSection::default();
        let first = &checker.predicted_environment()[0][0];
        assert!((first.length() - (4.0 + 2.0 * planning.lon_safety_buffer)).abs() < 1e-9);
        assert!((first.width() - (2.0 + 2.0 * planning.lat_safety_buffer)).abs() < 1e-9);
    }

    #[test]
    fn test_moving_obstacle_checked_per_step() {
        // obstacle ahead driving away faster than the ego closes in
        let mut object = stopped_obstacle_at(1, 20.0, 0.0);
        object.twist.linear.x = 12.0;
        let checker = checker_for(vec![object], false);
        let trajectory = straight_trajectory(8.0, 60, 0.1);
        assert!(!checker.is_collision(&trajectory));

        let mut slow_leader = stopped_obstacle_at(2, 20.0, 0.0);
        slow_leader.twist.linear.x = 1.0;
        let checker = checker_for(vec![slow_leader], false);
        assert!(checker.is_collision(&trajectory));
    }

    #[test]
    fn test_keeps_lateral_neighbors_when_ego_off_lane() {
        let line = straight_line();
        let snapshot = ObstacleSnapshot::from_objects(&[stopped_obstacle_at(1, 10.0, 0.0)]);
        let planning = PlanningSection::default();
        let graph = StGraph::build(&snapshot, &line, planning.max_lookahead_time, planning.delta_t);
        // ego off the lane band: nothing may be pruned
        let checker = CollisionChecker::new(
            &snapshot,
            &graph,
            &line,
            30.0,
            4.0,
            &planning,
            &VehicleParams::default(),
            false,
        );
        assert_eq!(checker.predicted_environment()[0].len(), 1);
    }
}
