//! Maneuver decisions and the structured goal handed to the lattice planner.

use std::sync::Arc;

use crate::reference::ReferenceLine;

/// High-level decision emitted by the maneuver evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecisionType {
    #[default]
    FollowLane,
    ChangeLeft,
    ChangeRight,
    StopAtTrafficSign,
    StopAtDestination,
    EmergencyStop,
}

impl DecisionType {
    /// Combination priority; higher wins.
    fn priority(&self) -> u8 {
        match self {
            DecisionType::EmergencyStop => 3,
            DecisionType::StopAtTrafficSign | DecisionType::StopAtDestination => 2,
            DecisionType::ChangeLeft | DecisionType::ChangeRight => 1,
            DecisionType::FollowLane => 0,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            DecisionType::StopAtTrafficSign
                | DecisionType::StopAtDestination
                | DecisionType::EmergencyStop
        )
    }
}

/// Target for one lane involved in the maneuver.
#[derive(Clone, Default)]
pub struct ManeuverInfo {
    pub lane_id: i32,
    pub has_stop_point: bool,
    /// Stop position along the lane's reference line, meaningful when
    /// `has_stop_point`
    pub target_s: f64,
    pub target_speed: f64,
    pub reference_line: Option<Arc<ReferenceLine>>,
}

impl std::fmt::Debug for ManeuverInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManeuverInfo")
            .field("lane_id", &self.lane_id)
            .field("has_stop_point", &self.has_stop_point)
            .field("target_s", &self.target_s)
            .field("target_speed", &self.target_speed)
            .field("has_reference_line", &self.reference_line.is_some())
            .finish()
    }
}

/// Structured maneuver goal: a decision plus at most two lane targets
/// (current lane first, target lane second when changing).
#[derive(Clone, Debug, Default)]
pub struct ManeuverGoal {
    pub decision_type: DecisionType,
    pub infos: Vec<ManeuverInfo>,
}

impl ManeuverGoal {
    pub fn new(decision_type: DecisionType, infos: Vec<ManeuverInfo>) -> Self {
        debug_assert!(infos.len() <= 2, "at most current + target lane");
        Self {
            decision_type,
            infos,
        }
    }

    /// The current-lane target.
    pub fn current(&self) -> Option<&ManeuverInfo> {
        self.infos.first()
    }
}

/// Merge two per-tick decisions. Priority order: EmergencyStop > StopAt* >
/// Change* > FollowLane; on equal priority the more restrictive goal wins
/// (nearer stop point, lower target speed).
pub fn combine_maneuver(lhs: ManeuverGoal, rhs: ManeuverGoal) -> ManeuverGoal {
    let lp = lhs.decision_type.priority();
    let rp = rhs.decision_type.priority();
    if lp > rp {
        return lhs;
    }
    if rp > lp {
        return rhs;
    }
    let Some((a_stop, a_s, a_speed)) = lhs
        .current()
        .map(|i| (i.has_stop_point, i.target_s, i.target_speed))
    else {
        return rhs;
    };
    let Some((b_stop, b_s, b_speed)) = rhs
        .current()
        .map(|i| (i.has_stop_point, i.target_s, i.target_speed))
    else {
        return lhs;
    };
    if a_stop && b_stop {
        if a_s <= b_s {
            lhs
        } else {
            rhs
        }
    } else if a_speed <= b_speed {
        lhs
    } else {
        rhs
    }
}
