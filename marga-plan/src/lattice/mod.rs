//! Frenet lattice planning: polynomials, end-condition sampling, ST graph,
//! collision checking and candidate selection.

pub mod collision;
pub mod planner;
pub mod polynomial;
pub mod sampler;
pub mod st_graph;

pub use collision::{CollisionChecker, PredictedEnvironment};
pub use planner::FrenetLatticePlanner;
pub use polynomial::{Polynomial, QuarticPolynomial, QuinticPolynomial};
pub use sampler::{EndCondition, EndConditionSampler};
pub use st_graph::{StBlock, StGraph};
