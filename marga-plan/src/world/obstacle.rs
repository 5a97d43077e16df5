//! Perceived dynamic obstacles and the per-tick obstacle snapshot.

use std::collections::HashMap;

use crate::core::math::{angle_lerp, lerp};
use crate::core::{Box2d, KinoDynamicState, TrajectoryPoint, Vec2};
use crate::io::messages::ObjectStatus;

/// A tracked dynamic obstacle with predicted motion.
#[derive(Clone, Debug)]
pub struct Obstacle {
    id: i32,
    state: KinoDynamicState,
    length: f64,
    width: f64,
    is_valid: bool,
    /// Predicted trajectory ordered by `relative_time`; empty means
    /// "extrapolate from the current state".
    prediction: Vec<TrajectoryPoint>,
}

impl Obstacle {
    pub fn new(
        id: i32,
        state: KinoDynamicState,
        length: f64,
        width: f64,
        prediction: Vec<TrajectoryPoint>,
    ) -> Self {
        let is_valid = state.x.is_finite()
            && state.y.is_finite()
            && state.theta.is_finite()
            && length > 0.0
            && width > 0.0;
        Self {
            id,
            state,
            length,
            width,
            is_valid,
            prediction,
        }
    }

    /// Build from a perception object message. Curvature is derived from
    /// yaw rate over speed the same way the ego state is.
    pub fn from_object(object: &ObjectStatus) -> Self {
        let v = (object.twist.linear.x.powi(2) + object.twist.linear.y.powi(2)).sqrt();
        let kappa = if v < 1e-6 {
            0.0
        } else {
            object.twist.angular.z / v
        };
        let state = KinoDynamicState::new(
            object.pose.x,
            object.pose.y,
            object.pose.z,
            object.pose.yaw,
            kappa,
            v,
            0.0,
            v * v * kappa,
        );
        Self::new(
            object.id,
            state,
            object.dimensions.x,
            object.dimensions.y,
            object.prediction.clone(),
        )
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn state(&self) -> &KinoDynamicState {
        &self.state
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn speed(&self) -> f64 {
        self.state.v
    }

    pub fn prediction(&self) -> &[TrajectoryPoint] {
        &self.prediction
    }

    /// Predicted pose at `relative_time`, interpolating the prediction and
    /// falling back to a constant-curvature rollout of the current state
    /// when no prediction is available (or past its end).
    pub fn point_at(&self, relative_time: f64) -> TrajectoryPoint {
        if self.prediction.is_empty() {
            return self
                .state
                .next_state_after(relative_time)
                .to_trajectory_point(relative_time);
        }

        let first = &self.prediction[0];
        if relative_time <= first.relative_time {
            let mut p = *first;
            p.relative_time = relative_time;
            return p;
        }
        let last = self.prediction.last().expect("non-empty prediction");
        if relative_time >= last.relative_time {
            // extrapolate beyond the prediction horizon
            let mut rollout = KinoDynamicState::new(
                last.path_point.x,
                last.path_point.y,
                0.0,
                last.path_point.theta,
                last.path_point.kappa,
                last.v,
                last.a,
                0.0,
            )
            .next_state_after(relative_time - last.relative_time)
            .to_trajectory_point(relative_time);
            rollout.path_point.s = last.path_point.s;
            return rollout;
        }

        let idx = self
            .prediction
            .partition_point(|p| p.relative_time <= relative_time);
        let a = &self.prediction[idx - 1];
        let b = &self.prediction[idx];
        let t = (relative_time - a.relative_time) / (b.relative_time - a.relative_time);
        TrajectoryPoint {
            path_point: crate::core::PathPoint {
                x: lerp(a.path_point.x, b.path_point.x, t),
                y: lerp(a.path_point.y, b.path_point.y, t),
                theta: angle_lerp(a.path_point.theta, b.path_point.theta, t),
                kappa: lerp(a.path_point.kappa, b.path_point.kappa, t),
                dkappa: lerp(a.path_point.dkappa, b.path_point.dkappa, t),
                s: lerp(a.path_point.s, b.path_point.s, t),
            },
            v: lerp(a.v, b.v, t),
            a: lerp(a.a, b.a, t),
            relative_time,
        }
    }

    /// Oriented bounding box at a (predicted) trajectory point.
    pub fn bounding_box_at(&self, point: &TrajectoryPoint) -> Box2d {
        Box2d::new(
            Vec2::new(point.path_point.x, point.path_point.y),
            point.path_point.theta,
            self.length,
            self.width,
        )
    }
}

/// Immutable per-tick obstacle map, rebuilt from the latest perception
/// message at tick start.
#[derive(Clone, Debug, Default)]
pub struct ObstacleSnapshot {
    obstacles: HashMap<i32, Obstacle>,
}

impl ObstacleSnapshot {
    pub fn from_objects(objects: &[ObjectStatus]) -> Self {
        let obstacles = objects
            .iter()
            .map(Obstacle::from_object)
            .filter(|o| o.is_valid())
            .map(|o| (o.id(), o))
            .collect();
        Self { obstacles }
    }

    pub fn get(&self, id: i32) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}
