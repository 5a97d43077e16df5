//! Maneuver state machine.
//!
//! A tagged variant with a pure transition function: the combined decision
//! of a tick maps every state onto its successor. Transitions are logged;
//! no other side effects.

use super::goal::DecisionType;

/// Active maneuver of the ego vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManeuverState {
    #[default]
    FollowLane,
    ChangeLeftLane,
    ChangeRightLane,
    Stop,
    EmergencyStop,
}

impl ManeuverState {
    pub fn name(&self) -> &'static str {
        match self {
            ManeuverState::FollowLane => "FollowLane",
            ManeuverState::ChangeLeftLane => "ChangeLeftLane",
            ManeuverState::ChangeRightLane => "ChangeRightLane",
            ManeuverState::Stop => "Stop",
            ManeuverState::EmergencyStop => "EmergencyStop",
        }
    }

    /// Successor state for a combined decision. The mapping is the same
    /// from every state; history only shows up in the transition log.
    pub fn from_decision(decision: DecisionType) -> ManeuverState {
        match decision {
            DecisionType::FollowLane => ManeuverState::FollowLane,
            DecisionType::ChangeLeft => ManeuverState::ChangeLeftLane,
            DecisionType::ChangeRight => ManeuverState::ChangeRightLane,
            DecisionType::StopAtTrafficSign | DecisionType::StopAtDestination => {
                ManeuverState::Stop
            }
            DecisionType::EmergencyStop => ManeuverState::EmergencyStop,
        }
    }

    /// Apply one tick's decision, logging state changes.
    pub fn transition(self, decision: DecisionType) -> ManeuverState {
        let next = ManeuverState::from_decision(decision);
        if next != self {
            log::info!("maneuver: {} -> {}", self.name(), next.name());
        }
        next
    }
}
