//! Maneuver decision layer: lane clearances, cost-based lane selection and
//! the maneuver state machine.

pub mod decision;
pub mod goal;
pub mod planner;
pub mod state;

pub use decision::{DecisionContext, LaneClearance, LaneState};
pub use goal::{combine_maneuver, DecisionType, ManeuverGoal, ManeuverInfo};
pub use planner::ManeuverPlanner;
pub use state::ManeuverState;
