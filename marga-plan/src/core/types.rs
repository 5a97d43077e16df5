//! Kinodynamic state, path and trajectory types exchanged between the
//! maneuver planner, the lattice planner and the node.
//!
//! Coordinate frame: world X forward-east, Y left-north, heading CCW from +X,
//! left-of-reference lateral offsets positive.

use serde::{Deserialize, Serialize};

use super::math::normalize_angle;

/// A point on a geometric path, annotated with arc length and curvature.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    /// Heading in radians, normalized to (-π, π]
    pub theta: f64,
    /// Curvature [1/m]
    pub kappa: f64,
    /// Curvature derivative w.r.t. arc length [1/m²]
    pub dkappa: f64,
    /// Arc length from the trajectory start [m]
    pub s: f64,
}

/// A path point with the motion state reaching it.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub path_point: PathPoint,
    /// Signed longitudinal velocity [m/s]
    pub v: f64,
    /// Signed longitudinal acceleration [m/s²]
    pub a: f64,
    /// Time offset from the trajectory header [s]
    pub relative_time: f64,
}

/// An emissible trajectory: points ordered by strictly increasing
/// `relative_time`, plus the header timestamp the offsets are relative to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Trajectory {
    /// Header stamp in seconds
    pub timestamp: f64,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Check the strictly-increasing `relative_time` invariant.
    pub fn is_time_monotone(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[1].relative_time > w[0].relative_time)
    }
}

/// Full kinodynamic state of a tracked body (ego or obstacle).
///
/// `v` and `a` are signed longitudinal quantities along the heading.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct KinoDynamicState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub theta: f64,
    pub kappa: f64,
    pub v: f64,
    pub a: f64,
    pub centripetal_acc: f64,
}

impl KinoDynamicState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: f64,
        y: f64,
        z: f64,
        theta: f64,
        kappa: f64,
        v: f64,
        a: f64,
        centripetal_acc: f64,
    ) -> Self {
        Self {
            x,
            y,
            z,
            theta,
            kappa,
            v,
            a,
            centripetal_acc,
        }
    }

    /// Roll the state forward by `dt` under constant curvature and constant
    /// acceleration. Velocity saturates at zero instead of going negative
    /// when braking through standstill.
    pub fn next_state_after(&self, dt: f64) -> KinoDynamicState {
        let v_next = (self.v + self.a * dt).max(0.0);
        let ds = 0.5 * (self.v + v_next) * dt;
        let mut next = *self;
        next.v = v_next;
        if self.kappa.abs() < 1e-6 {
            next.x += ds * self.theta.cos();
            next.y += ds * self.theta.sin();
        } else {
            let theta_next = normalize_angle(self.theta + self.kappa * ds);
            next.x += (theta_next.sin() - self.theta.sin()) / self.kappa;
            next.y += (self.theta.cos() - theta_next.cos()) / self.kappa;
            next.theta = theta_next;
        }
        next.centripetal_acc = next.v * next.v * next.kappa;
        next
    }

    /// View this state as a trajectory point at the given time offset.
    pub fn to_trajectory_point(&self, relative_time: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            path_point: PathPoint {
                x: self.x,
                y: self.y,
                theta: self.theta,
                kappa: self.kappa,
                dkappa: 0.0,
                s: 0.0,
            },
            v: self.v,
            a: self.a,
            relative_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_trajectory_time_monotone() {
        let mut traj = Trajectory::new(0.0);
        for i in 0..5 {
            let mut p = TrajectoryPoint::default();
            p.relative_time = i as f64 * 0.1;
            traj.points.push(p);
        }
        assert!(traj.is_time_monotone());
        traj.points[3].relative_time = 0.0;
        assert!(!traj.is_time_monotone());
    }

    #[test]
    fn test_rollout_straight() {
        let state = KinoDynamicState::new(0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0);
        let next = state.next_state_after(1.0);
        assert_relative_eq!(next.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(next.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(next.v, 10.0);
    }

    #[test]
    fn test_rollout_quarter_circle() {
        // kappa = 1/10, travel a quarter of the circle
        let radius = 10.0;
        let v = 5.0;
        let state = KinoDynamicState::new(0.0, 0.0, 0.0, 0.0, 1.0 / radius, v, 0.0, 0.0);
        let t = radius * FRAC_PI_2 / v;
        let next = state.next_state_after(t);
        assert_relative_eq!(next.x, radius, epsilon = 1e-6);
        assert_relative_eq!(next.y, radius, epsilon = 1e-6);
        assert_relative_eq!(next.theta, FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_rollout_brakes_to_standstill() {
        let state = KinoDynamicState::new(0.0, 0.0, 0.0, 0.0, 0.0, 2.0, -4.0, 0.0);
        let next = state.next_state_after(1.0);
        assert_relative_eq!(next.v, 0.0);
    }
}
