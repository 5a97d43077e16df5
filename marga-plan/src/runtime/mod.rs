//! Tick orchestration: perception registry, per-tick context and the
//! planning node.

pub mod context;
pub mod node;
pub mod registry;

pub use context::PlanningContext;
pub use node::PlanningNode;
pub use registry::{LatestPerception, PerceptionRegistry};
