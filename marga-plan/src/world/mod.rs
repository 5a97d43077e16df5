//! Perception-facing world model: obstacles and the ego vehicle state.

pub mod obstacle;
pub mod vehicle;

pub use obstacle::{Obstacle, ObstacleSnapshot};
pub use vehicle::{VehicleGeometry, VehicleState};
