//! End-condition sampling for the lattice planner.
//!
//! End conditions are `([x, x', x''], T)` tuples in Frenet space. Lateral
//! conditions always finish parallel to the lane (d' = d'' = 0);
//! longitudinal conditions depend on the maneuver goal (cruise grid, stop
//! point, or gaps around obstacles projected in the ST graph).

use crate::config::PlanningSection;
use crate::lattice::st_graph::StGraph;

/// End state and the horizon time to reach it.
pub type EndCondition = ([f64; 3], f64);

pub struct EndConditionSampler<'a> {
    init_s: [f64; 3],
    planning: &'a PlanningSection,
    ego_length: f64,
}

impl<'a> EndConditionSampler<'a> {
    pub fn new(init_s: [f64; 3], planning: &'a PlanningSection, ego_length: f64) -> Self {
        Self {
            init_s,
            planning,
            ego_length,
        }
    }

    /// Horizon time grid `[min_horizon_time, max_lookahead_time]`.
    pub fn horizon_times(&self) -> Vec<f64> {
        let mut times = Vec::new();
        let mut t = self.planning.min_horizon_time;
        while t <= self.planning.max_lookahead_time + 1e-9 {
            times.push(t);
            t += self.planning.horizon_time_step;
        }
        times
    }

    /// Lateral end states: offset grid x horizon times, ending parallel to
    /// the lane.
    pub fn lateral_end_conditions(&self) -> Vec<EndCondition> {
        let mut conditions = Vec::new();
        let step = self.planning.lateral_offset_step.max(1e-3);
        let mut offset = -self.planning.lateral_offset_max;
        while offset <= self.planning.lateral_offset_max + 1e-9 {
            for t in self.horizon_times() {
                conditions.push(([offset, 0.0, 0.0], t));
            }
            offset += step;
        }
        conditions
    }

    /// Cruising end states: speed grid around the target, free end position
    /// (consumed by quartic polynomials).
    pub fn lon_end_conditions_cruising(&self, target_speed: f64) -> Vec<EndCondition> {
        let mut conditions = Vec::new();
        let count = self.planning.speed_sample_count as i64;
        for t in self.horizon_times() {
            for k in -count..=count {
                let v = (target_speed + k as f64 * self.planning.speed_sample_step)
                    .clamp(0.0, self.planning.max_lon_velocity);
                conditions.push(([0.0, v, 0.0], t));
            }
        }
        conditions
    }

    /// Stopping end states: standstill at the stop point for every horizon.
    pub fn lon_end_conditions_stopping(&self, stop_s: f64) -> Vec<EndCondition> {
        self.horizon_times()
            .into_iter()
            .map(|t| ([stop_s, 0.0, 0.0], t))
            .collect()
    }

    /// Follow/overtake end states around every obstacle ahead in the ST
    /// graph: match its speed either a safety gap behind its rear edge or a
    /// safety gap past its front edge.
    pub fn lon_end_conditions_follow(&self, st_graph: &StGraph) -> Vec<EndCondition> {
        let mut conditions = Vec::new();
        // the gap must clear the checker's inflated boxes: one buffer per
        // side of the obstacle plus the ego body
        let gap = 2.0 * self.planning.lon_safety_buffer + self.ego_length;
        for (_, block) in st_graph.blocks() {
            if block.s_low + block.length < self.init_s[0] {
                continue;
            }
            for t in self.horizon_times() {
                let rear_edge = block.s_low + block.speed * t;
                let front_edge = rear_edge + block.length;
                let follow_s = rear_edge - gap;
                if follow_s > self.init_s[0] {
                    conditions.push(([follow_s, block.speed, 0.0], t));
                }
                let overtake_s = front_edge + gap;
                conditions.push(([overtake_s, block.speed, 0.0], t));
            }
        }
        conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::messages::{ObjectStatus, Vector3};
    use crate::reference::{ReferenceLine, WayPoint};
    use crate::world::ObstacleSnapshot;

    fn planning() -> PlanningSection {
        PlanningSection::default()
    }

    #[test]
    fn test_horizon_grid_spans_lookahead() {
        let planning = planning();
        let sampler = EndConditionSampler::new([0.0, 0.0, 0.0], &planning, 4.7);
        let times = sampler.horizon_times();
        assert_eq!(times.len(), 3); // 4, 6, 8 s
        assert!((times[0] - 4.0).abs() < 1e-9);
        assert!((*times.last().unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_lateral_grid_is_symmetric_and_parallel() {
        let planning = planning();
        let sampler = EndConditionSampler::new([0.0, 0.0, 0.0], &planning, 4.7);
        let conditions = sampler.lateral_end_conditions();
        // 5 offsets x 3 horizons
        assert_eq!(conditions.len(), 15);
        assert!(conditions.iter().any(|(d, _)| d[0] == 0.0));
        assert!(conditions
            .iter()
            .all(|(d, _)| d[1] == 0.0 && d[2] == 0.0));
        let min = conditions.iter().map(|(d, _)| d[0]).fold(f64::MAX, f64::min);
        let max = conditions.iter().map(|(d, _)| d[0]).fold(f64::MIN, f64::max);
        assert!((min + 1.0).abs() < 1e-9 && (max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cruise_speeds_clamped_to_limits() {
        let planning = planning();
        let sampler = EndConditionSampler::new([0.0, 0.5, 0.0], &planning, 4.7);
        let conditions = sampler.lon_end_conditions_cruising(1.0);
        assert!(conditions.iter().all(|(s, _)| s[1] >= 0.0));
        assert!(conditions.iter().any(|(s, _)| s[1] == 0.0));
    }

    #[test]
    fn test_stopping_targets_fixed_position() {
        let planning = planning();
        let sampler = EndConditionSampler::new([0.0, 5.0, 0.0], &planning, 4.7);
        let conditions = sampler.lon_end_conditions_stopping(42.0);
        assert_eq!(conditions.len(), sampler.horizon_times().len());
        assert!(conditions
            .iter()
            .all(|(s, _)| s[0] == 42.0 && s[1] == 0.0 && s[2] == 0.0));
    }

    #[test]
    fn test_follow_conditions_bracket_the_leader() {
        let planning = planning();
        let waypoints: Vec<WayPoint> = (0..=40)
            .map(|i| WayPoint {
                x: i as f64 * 5.0,
                y: 0.0,
                ..WayPoint::default()
            })
            .collect();
        let line = ReferenceLine::from_waypoints(&waypoints, 1.0).unwrap();
        let mut object = ObjectStatus::default();
        object.id = 1;
        object.pose.x = 60.0;
        object.twist.linear.x = 4.0;
        object.dimensions = Vector3 {
            x: 4.0,
            y: 2.0,
            z: 1.5,
        };
        let snapshot = ObstacleSnapshot::from_objects(&[object]);
        let graph = StGraph::build(&snapshot, &line, planning.max_lookahead_time, planning.delta_t);
        assert!(graph.is_obstacle_in_graph(1));

        let sampler = EndConditionSampler::new([20.0, 8.0, 0.0], &planning, 4.7);
        let conditions = sampler.lon_end_conditions_follow(&graph);
        assert!(!conditions.is_empty());
        // all end speeds match the leader
        assert!(conditions.iter().all(|(s, _)| (s[1] - 4.0).abs() < 1e-9));
        // follow targets sit behind the leader's rear at that horizon,
        // overtake targets ahead of its front
        for (s, t) in &conditions {
            let rear = 58.0 + 4.0 * t;
            let front = 62.0 + 4.0 * t;
            assert!(s[0] < rear || s[0] > front);
        }
    }
}
