//! Fundamental types: angular math, kinodynamic state, trajectories and
//! oriented boxes.

pub mod box2d;
pub mod math;
pub mod types;

pub use box2d::{Box2d, Vec2};
pub use types::{KinoDynamicState, PathPoint, Trajectory, TrajectoryPoint};
