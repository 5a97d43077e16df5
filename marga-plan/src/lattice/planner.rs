//! Frenet lattice trajectory planner.
//!
//! For every reference line in the maneuver goal: sample end conditions,
//! solve longitudinal and lateral polynomials, rank all pairs on a cost
//! heap, then walk the heap in ascending cost combining each pair into a
//! Cartesian trajectory, dropping infeasible candidates and returning the
//! first collision-free one. A constant-deceleration stop trajectory is the
//! fallback when nothing survives.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

use rayon::prelude::*;

use crate::config::PlanningConfig;
use crate::core::{PathPoint, Trajectory, TrajectoryPoint};
use crate::error::{PlanningError, Result};
use crate::frenet::{self, CartesianState};
use crate::lattice::collision::CollisionChecker;
use crate::lattice::polynomial::{Polynomial, QuarticPolynomial, QuinticPolynomial};
use crate::lattice::sampler::EndConditionSampler;
use crate::lattice::st_graph::StGraph;
use crate::maneuver::{DecisionType, ManeuverGoal, ManeuverInfo};
use crate::reference::ReferenceLine;
use crate::world::ObstacleSnapshot;

/// Candidate entry on the cost heap.
#[derive(Clone, Debug)]
struct CandidateNode {
    cost: f64,
    lon: usize,
    lat: usize,
}

impl PartialEq for CandidateNode {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Eq for CandidateNode {}

impl Ord for CandidateNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for a min-heap (lower cost = higher priority)
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for CandidateNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lattice planner over the reference lines of one maneuver goal.
pub struct FrenetLatticePlanner<'a> {
    config: &'a PlanningConfig,
    parallel: bool,
}

impl<'a> FrenetLatticePlanner<'a> {
    pub fn new(config: &'a PlanningConfig, parallel: bool) -> Self {
        Self { config, parallel }
    }

    /// Plan a trajectory for the goal. Never panics and always produces an
    /// emissible trajectory unless the goal carries no reference line at
    /// all (`InvalidInput`).
    pub fn plan(
        &self,
        init: &TrajectoryPoint,
        goal: &ManeuverGoal,
        obstacles: &ObstacleSnapshot,
        cancel: &AtomicBool,
        timestamp: f64,
    ) -> Result<Trajectory> {
        if goal.decision_type == DecisionType::EmergencyStop {
            return Ok(self.emergency_stop_trajectory(init, timestamp));
        }

        let infos: Vec<&ManeuverInfo> = goal
            .infos
            .iter()
            .filter(|info| info.reference_line.is_some())
            .collect();
        if infos.is_empty() {
            return Err(PlanningError::InvalidInput(
                "maneuver goal carries no reference line".into(),
            ));
        }

        let deadline =
            Instant::now() + std::time::Duration::from_millis(self.config.runtime.tick_deadline_ms);

        let best = if self.parallel {
            infos
                .par_iter()
                .filter_map(|info| {
                    self.plan_on_reference(init, info, obstacles, cancel, deadline, timestamp)
                })
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        } else {
            infos
                .iter()
                .filter_map(|info| {
                    self.plan_on_reference(init, info, obstacles, cancel, deadline, timestamp)
                })
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        };

        match best {
            Some((trajectory, _cost)) => Ok(trajectory),
            None => {
                log::warn!("no feasible collision-free candidate, emitting emergency stop");
                Ok(self.emergency_stop_trajectory(init, timestamp))
            }
        }
    }

    /// Plan against a single reference line; returns the best trajectory
    /// and its cost.
    fn plan_on_reference(
        &self,
        init: &TrajectoryPoint,
        info: &ManeuverInfo,
        obstacles: &ObstacleSnapshot,
        cancel: &AtomicBool,
        deadline: Instant,
        timestamp: f64,
    ) -> Option<(Trajectory, f64)> {
        let planning = &self.config.planning;
        let ref_line = info.reference_line.as_ref()?;

        let (init_s, init_d) = match self.init_condition(ref_line, init) {
            Ok(conditions) => conditions,
            Err(e) => {
                log::warn!("init condition failed: {}", e);
                return None;
            }
        };

        let st_graph = StGraph::build(
            obstacles,
            ref_line,
            planning.max_lookahead_time,
            planning.delta_t,
        );
        let checker = CollisionChecker::new(
            obstacles,
            &st_graph,
            ref_line,
            init_s[0],
            init_d[0],
            planning,
            &self.config.vehicle,
            self.parallel,
        );

        let sampler = EndConditionSampler::new(init_s, planning, self.config.vehicle.length);
        let lon_arena = self.generate_lon_polynomials(&sampler, &st_graph, info, &init_s);
        let lat_arena = self.generate_lat_polynomials(&sampler, &init_s, &init_d);
        if lon_arena.is_empty() || lat_arena.is_empty() {
            return None;
        }

        let mut heap = self.rank_candidates(&lon_arena, &lat_arena, ref_line, info);

        while let Some(node) = heap.pop() {
            if cancel.load(AtomicOrdering::Relaxed) || Instant::now() >= deadline {
                log::warn!("candidate scan cancelled before a feasible trajectory was found");
                return None;
            }
            let lon = lon_arena[node.lon].as_ref();
            let lat = lat_arena[node.lat].as_ref();
            let Some(trajectory) =
                self.combine(ref_line, lon, lat, &init_s, timestamp)
            else {
                continue;
            };
            if checker.is_collision(&trajectory) {
                continue;
            }
            return Some((trajectory, node.cost));
        }
        None
    }

    /// Project the planning start point onto the reference line.
    fn init_condition(
        &self,
        ref_line: &ReferenceLine,
        init: &TrajectoryPoint,
    ) -> Result<([f64; 3], [f64; 3])> {
        let (matched, _s) = ref_line.matched_point(init.path_point.x, init.path_point.y);
        frenet::cartesian_to_frenet(
            &matched,
            &CartesianState {
                x: init.path_point.x,
                y: init.path_point.y,
                theta: init.path_point.theta,
                kappa: init.path_point.kappa,
                v: init.v,
                a: init.a,
            },
        )
    }

    fn generate_lon_polynomials(
        &self,
        sampler: &EndConditionSampler<'_>,
        st_graph: &StGraph,
        info: &ManeuverInfo,
        init_s: &[f64; 3],
    ) -> Vec<Box<dyn Polynomial>> {
        let mut arena: Vec<Box<dyn Polynomial>> = Vec::new();
        if info.has_stop_point {
            for (end, t) in sampler.lon_end_conditions_stopping(info.target_s) {
                if let Ok(poly) = QuinticPolynomial::new(
                    init_s[0], init_s[1], init_s[2], end[0], end[1], end[2], t,
                ) {
                    arena.push(Box::new(poly));
                }
            }
        } else {
            for (end, t) in sampler.lon_end_conditions_cruising(info.target_speed) {
                if let Ok(poly) =
                    QuarticPolynomial::new(init_s[0], init_s[1], init_s[2], end[1], end[2], t)
                {
                    arena.push(Box::new(poly));
                }
            }
            for (end, t) in sampler.lon_end_conditions_follow(st_graph) {
                if let Ok(poly) = QuinticPolynomial::new(
                    init_s[0], init_s[1], init_s[2], end[0], end[1], end[2], t,
                ) {
                    arena.push(Box::new(poly));
                }
            }
        }
        arena
    }

    fn generate_lat_polynomials(
        &self,
        sampler: &EndConditionSampler<'_>,
        init_s: &[f64; 3],
        init_d: &[f64; 3],
    ) -> Vec<Box<dyn Polynomial>> {
        // lateral boundary in the horizon-time parameter: chain rule from
        // arc-length derivatives through the initial longitudinal speed
        let d_dot = init_d[1] * init_s[1];
        let d_ddot = init_d[2] * init_s[1] * init_s[1] + init_d[1] * init_s[2];
        let mut arena: Vec<Box<dyn Polynomial>> = Vec::new();
        for (end, t) in sampler.lateral_end_conditions() {
            if let Ok(poly) =
                QuinticPolynomial::new(init_d[0], d_dot, d_ddot, end[0], end[1], end[2], t)
            {
                arena.push(Box::new(poly));
            }
        }
        arena
    }

    /// Cost every lon/lat pair and heap them, cheapest on top.
    fn rank_candidates(
        &self,
        lon_arena: &[Box<dyn Polynomial>],
        lat_arena: &[Box<dyn Polynomial>],
        ref_line: &ReferenceLine,
        info: &ManeuverInfo,
    ) -> BinaryHeap<CandidateNode> {
        let pairs: Vec<(usize, usize)> = (0..lon_arena.len())
            .flat_map(|i| (0..lat_arena.len()).map(move |j| (i, j)))
            .collect();
        let cost_of = |&(i, j): &(usize, usize)| CandidateNode {
            cost: self.pair_cost(lon_arena[i].as_ref(), lat_arena[j].as_ref(), ref_line, info),
            lon: i,
            lat: j,
        };
        let nodes: Vec<CandidateNode> = if self.parallel {
            pairs.par_iter().map(cost_of).collect()
        } else {
            pairs.iter().map(cost_of).collect()
        };
        BinaryHeap::from(nodes)
    }

    /// Weighted sum of smoothness, speed deviation, lateral offset,
    /// centripetal acceleration and time-to-goal.
    fn pair_cost(
        &self,
        lon: &dyn Polynomial,
        lat: &dyn Polynomial,
        ref_line: &ReferenceLine,
        info: &ManeuverInfo,
    ) -> f64 {
        let planning = &self.config.planning;
        let dt = planning.delta_t;

        let mut lon_jerk_sq = 0.0;
        let mut centripetal = 0.0;
        let mut steps = 0usize;
        let mut t = 0.0;
        while t <= lon.end_time() + 1e-9 {
            lon_jerk_sq += lon.jerk(t).powi(2) * dt;
            let s = lon.position(t).clamp(0.0, ref_line.length());
            let kappa = ref_line.reference_point(s).kappa;
            centripetal += (lon.velocity(t).powi(2) * kappa).abs();
            steps += 1;
            t += dt;
        }
        let centripetal_mean = centripetal / steps.max(1) as f64;

        let mut lat_jerk_sq = 0.0;
        let mut lat_offset_sq = 0.0;
        let mut p = 0.0;
        while p <= lat.end_time() + 1e-9 {
            lat_jerk_sq += lat.jerk(p).powi(2) * dt;
            lat_offset_sq += lat.position(p).powi(2) * dt;
            p += dt;
        }

        // deviation is measured against the cruise target, not the lane's
        // capped speed: a lane stuck behind a crawler must score worse than
        // a free lane even though both track their own caps
        let target_speed = if info.has_stop_point {
            0.0
        } else {
            planning.target_speed
        };
        let speed_dev = (target_speed - lon.velocity(lon.end_time())).powi(2);
        // stopping goals also pay for terminal position error
        let position_dev = if info.has_stop_point {
            (info.target_s - lon.end_position()).powi(2)
        } else {
            0.0
        };

        planning.weight_jerk * (lon_jerk_sq + lat_jerk_sq)
            + planning.weight_speed_deviation * (speed_dev + position_dev)
            + planning.weight_lateral_offset * lat_offset_sq
            + planning.weight_centripetal * centripetal_mean
            + planning.weight_time * lon.end_time()
    }

    /// Combine a lon/lat pair into a Cartesian trajectory, applying the
    /// feasibility pre-filter. Returns `None` when any sample violates a
    /// bound or the Frenet geometry degenerates.
    fn combine(
        &self,
        ref_line: &ReferenceLine,
        lon: &dyn Polynomial,
        lat: &dyn Polynomial,
        init_s: &[f64; 3],
        timestamp: f64,
    ) -> Option<Trajectory> {
        let planning = &self.config.planning;
        let dt = planning.delta_t;
        let s0 = init_s[0];
        let s_range = lon.end_position() - s0;

        // during a lane change the start offset lies outside the target
        // lane's band; the road-edge filter widens to cover it
        let d0 = lat.position(0.0);

        let mut trajectory = Trajectory::new(timestamp);
        let mut t = 0.0;
        while t <= lon.end_time() + 1e-9 {
            let s = lon.position(t);
            if s > ref_line.length() {
                break;
            }
            let s_cond = [s, lon.velocity(t), lon.acceleration(t)];

            // arc-length re-parameterization: lateral motion finishes with
            // the generated s-range
            let (progress, dp_ds) = if s_range > 1e-6 {
                (
                    ((s - s0) / s_range).clamp(0.0, 1.0),
                    lat.end_time() / s_range,
                )
            } else {
                (0.0, 0.0)
            };
            let p = progress * lat.end_time();
            let d_cond = [
                lat.position(p),
                lat.velocity(p) * dp_ds,
                lat.acceleration(p) * dp_ds * dp_ds,
            ];

            let ref_point = ref_line.reference_point(s);
            let cartesian = match frenet::frenet_to_cartesian(&ref_point, &s_cond, &d_cond) {
                Ok(state) => state,
                Err(_) => return None,
            };

            if cartesian.v > planning.max_lon_velocity + 1e-6 {
                return None;
            }
            if cartesian.a > planning.max_lon_acc + 1e-6
                || cartesian.a < -planning.max_lon_decel - 1e-6
            {
                return None;
            }
            if cartesian.kappa.abs() > planning.max_kappa {
                return None;
            }
            if lon.jerk(t).abs() > planning.max_jerk {
                return None;
            }
            let (left, right) = ref_line.lane_width(s);
            let left_bound = (left + planning.road_edge_tolerance).max(d0 + planning.road_edge_tolerance);
            let right_bound =
                (right + planning.road_edge_tolerance).max(-d0 + planning.road_edge_tolerance);
            if d_cond[0] > left_bound || d_cond[0] < -right_bound {
                return None;
            }

            trajectory.points.push(TrajectoryPoint {
                path_point: PathPoint {
                    x: cartesian.x,
                    y: cartesian.y,
                    theta: cartesian.theta,
                    kappa: cartesian.kappa,
                    dkappa: 0.0,
                    s: s - s0,
                },
                v: cartesian.v,
                a: cartesian.a,
                relative_time: t,
            });
            t += dt;
        }

        if trajectory.len() < 2 {
            return None;
        }
        Some(trajectory)
    }

    /// Constant-deceleration straight-line stop from the init state.
    /// Always succeeds; the heading is held.
    pub fn emergency_stop_trajectory(&self, init: &TrajectoryPoint, timestamp: f64) -> Trajectory {
        let planning = &self.config.planning;
        let dt = planning.delta_t;
        let decel = planning.max_lon_decel;
        let v0 = init.v.max(0.0);
        let stop_time = v0 / decel;
        let horizon = stop_time + 1.0;
        let theta = init.path_point.theta;

        let mut trajectory = Trajectory::new(timestamp);
        let mut t = 0.0;
        while t <= horizon + 1e-9 {
            let (dist, v, a) = if t < stop_time {
                (v0 * t - 0.5 * decel * t * t, v0 - decel * t, -decel)
            } else {
                (0.5 * v0 * stop_time, 0.0, 0.0)
            };
            trajectory.points.push(TrajectoryPoint {
                path_point: PathPoint {
                    x: init.path_point.x + dist * theta.cos(),
                    y: init.path_point.y + dist * theta.sin(),
                    theta,
                    kappa: init.path_point.kappa,
                    dkappa: 0.0,
                    s: dist,
                },
                v,
                a,
                relative_time: t,
            });
            t += dt;
        }
        trajectory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maneuver::ManeuverInfo;
    use crate::reference::WayPoint;
    use std::sync::Arc;

    fn config() -> PlanningConfig {
        let mut config = PlanningConfig::default();
        // debug builds are slow; keep the deadline out of the way
        config.runtime.tick_deadline_ms = 30_000;
        config
    }

    fn straight_line(length: f64) -> Arc<ReferenceLine> {
        let waypoints: Vec<WayPoint> = (0..=(length as usize / 5))
            .map(|i| WayPoint {
                x: i as f64 * 5.0,
                y: 0.0,
                ..WayPoint::default()
            })
            .collect();
        Arc::new(ReferenceLine::from_waypoints(&waypoints, 1.0).unwrap())
    }

    fn init_at(s: f64, v: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            path_point: PathPoint {
                x: s,
                y: 0.0,
                ..PathPoint::default()
            },
            v,
            a: 0.0,
            relative_time: 0.0,
        }
    }

    fn cruise_goal(ref_line: Arc<ReferenceLine>, target_speed: f64) -> ManeuverGoal {
        ManeuverGoal::new(
            DecisionType::FollowLane,
            vec![ManeuverInfo {
                lane_id: 1,
                has_stop_point: false,
                target_s: 0.0,
                target_speed,
                reference_line: Some(ref_line),
            }],
        )
    }

    #[test]
    fn test_cruise_plan_accelerates_toward_target() {
        let config = config();
        let planner = FrenetLatticePlanner::new(&config, false);
        let goal = cruise_goal(straight_line(500.0), 10.0);
        let cancel = AtomicBool::new(false);
        let trajectory = planner
            .plan(&init_at(0.0, 0.0), &goal, &ObstacleSnapshot::default(), &cancel, 0.0)
            .unwrap();
        assert!(trajectory.is_time_monotone());
        let terminal = trajectory.points.last().unwrap();
        assert!(
            (terminal.v - 10.0).abs() < 1.5,
            "terminal speed {} should approach 10",
            terminal.v
        );
        // lateral deviation negligible on the straight road
        assert!(trajectory.points.iter().all(|p| p.path_point.y.abs() < 0.05));
        // dynamic bounds hold everywhere
        for p in &trajectory.points {
            assert!(p.v <= config.planning.max_lon_velocity + 1e-6);
            assert!(p.a <= config.planning.max_lon_acc + 1e-6);
            assert!(p.a >= -config.planning.max_lon_decel - 1e-6);
        }
    }

    #[test]
    fn test_stop_plan_reaches_standstill_at_target() {
        let config = config();
        let planner = FrenetLatticePlanner::new(&config, false);
        let ref_line = straight_line(500.0);
        let goal = ManeuverGoal::new(
            DecisionType::StopAtDestination,
            vec![ManeuverInfo {
                lane_id: 1,
                has_stop_point: true,
                target_s: 60.0,
                target_speed: 0.0,
                reference_line: Some(ref_line),
            }],
        );
        let cancel = AtomicBool::new(false);
        let trajectory = planner
            .plan(&init_at(0.0, 8.0), &goal, &ObstacleSnapshot::default(), &cancel, 0.0)
            .unwrap();
        let terminal = trajectory.points.last().unwrap();
        assert!(terminal.v.abs() < 0.3, "terminal v {} should be ~0", terminal.v);
        assert!(
            (terminal.path_point.x - 60.0).abs() < 2.0,
            "stops near s=60, got {}",
            terminal.path_point.x
        );
    }

    #[test]
    fn test_emergency_goal_produces_braking_profile() {
        let config = config();
        let planner = FrenetLatticePlanner::new(&config, false);
        let goal = ManeuverGoal::new(DecisionType::EmergencyStop, vec![]);
        let cancel = AtomicBool::new(false);
        let trajectory = planner
            .plan(&init_at(10.0, 8.0), &goal, &ObstacleSnapshot::default(), &cancel, 0.0)
            .unwrap();
        assert!(trajectory.is_time_monotone());
        assert!(trajectory.points.iter().all(|p| p.a <= 0.0));
        let mut prev_v = f64::MAX;
        for p in &trajectory.points {
            assert!(p.v <= prev_v + 1e-9);
            prev_v = p.v;
        }
        assert!(trajectory.points.last().unwrap().v == 0.0);
        // 8 m/s over 6 m/s^2 stops within 2 s
        let stop = trajectory
            .points
            .iter()
            .find(|p| p.v == 0.0)
            .unwrap()
            .relative_time;
        assert!(stop <= 2.0);
    }

    #[test]
    fn test_goal_without_reference_line_is_invalid_input() {
        let config = config();
        let planner = FrenetLatticePlanner::new(&config, false);
        let goal = ManeuverGoal::new(DecisionType::FollowLane, vec![]);
        let cancel = AtomicBool::new(false);
        let result = planner.plan(
            &init_at(0.0, 5.0),
            &goal,
            &ObstacleSnapshot::default(),
            &cancel,
            0.0,
        );
        assert!(matches!(result, Err(PlanningError::InvalidInput(_))));
    }

    #[test]
    fn test_cancel_flag_falls_back_to_emergency_stop() {
        let config = config();
        let planner = FrenetLatticePlanner::new(&config, false);
        let goal = cruise_goal(straight_line(500.0), 10.0);
        let cancel = AtomicBool::new(true);
        let trajectory = planner
            .plan(&init_at(0.0, 8.0), &goal, &ObstacleSnapshot::default(), &cancel, 0.0)
            .unwrap();
        // cancelled before any candidate: emergency profile (braking only)
        assert!(trajectory.points.iter().all(|p| p.a <= 0.0));
    }

    #[test]
    fn test_parallel_and_sequential_pick_equivalent_plans() {
        let config = config();
        let sequential = FrenetLatticePlanner::new(&config, false);
        let parallel = FrenetLatticePlanner::new(&config, true);
        let goal = cruise_goal(straight_line(500.0), 10.0);
        let cancel = AtomicBool::new(false);
        let a = sequential
            .plan(&init_at(0.0, 5.0), &goal, &ObstacleSnapshot::default(), &cancel, 0.0)
            .unwrap();
        let b = parallel
            .plan(&init_at(0.0, 5.0), &goal, &ObstacleSnapshot::default(), &cancel, 0.0)
            .unwrap();
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.points.iter().zip(b.points.iter()) {
            assert!((pa.path_point.x - pb.path_point.x).abs() < 1e-9);
            assert!((pa.v - pb.v).abs() < 1e-9);
        }
    }
}
