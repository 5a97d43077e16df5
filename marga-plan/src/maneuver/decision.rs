//! Per-tick maneuver evaluation: obstacle and traffic-light decisions,
//! lane-change admissibility and lane selection costs.

use std::sync::Arc;

use super::goal::{DecisionType, ManeuverGoal, ManeuverInfo};
use crate::config::{ManeuverSection, PlanningSection};
use crate::io::messages::{TrafficLightState, TrafficLightStatus};
use crate::reference::{ReferenceLine, SlPoint, WayPoint};
use crate::world::ObstacleSnapshot;

/// Clearances to the nearest traffic on one lane.
#[derive(Clone, Copy, Debug)]
pub struct LaneClearance {
    pub forward: f64,
    pub backward: f64,
    pub leading: Option<i32>,
    pub following: Option<i32>,
}

/// Lane summary fed into [`select_lane`]; order is left, current, right.
#[derive(Clone, Copy, Debug)]
pub struct LaneState {
    pub leading_vel: f64,
    pub following_vel: f64,
    pub forward_clear: f64,
    pub backward_clear: f64,
}

/// Everything the maneuver evaluation reads during one tick.
pub struct DecisionContext<'a> {
    pub ref_line: &'a Arc<ReferenceLine>,
    pub obstacles: &'a ObstacleSnapshot,
    pub traffic_lights: &'a [TrafficLightStatus],
    pub ego_sl: SlPoint,
    pub ego_vel: f64,
    pub ego_length: f64,
    pub planning: &'a PlanningSection,
    pub maneuver: &'a ManeuverSection,
}

impl<'a> DecisionContext<'a> {
    /// Nearest leading/following clearances on the lane `lane_offset` lanes
    /// to the side (-1 left, 0 current, +1 right). Clearances are
    /// bumper-to-bumper; lanes without traffic report the lookahead cap.
    pub fn lane_clearance(&self, lane_offset: i32) -> LaneClearance {
        let (left, right) = self.ref_line.lane_width(self.ego_sl.s);
        let lane_width = left + right;
        let center_l = -(lane_offset as f64) * lane_width;

        let cap = self.planning.max_lookahead_distance;
        let mut clearance = LaneClearance {
            forward: cap,
            backward: cap,
            leading: None,
            following: None,
        };
        for obstacle in self.obstacles.iter() {
            let point = obstacle.point_at(0.0);
            let sl = self
                .ref_line
                .xy_to_sl(point.path_point.x, point.path_point.y);
            if sl.s <= 0.0 || sl.s >= self.ref_line.length() {
                continue;
            }
            if (sl.l - center_l).abs() > 0.5 * lane_width {
                continue;
            }
            let gap = sl.s - self.ego_sl.s;
            let body = 0.5 * obstacle.length() + 0.5 * self.ego_length;
            if gap > 0.0 {
                let clear = gap - body;
                if clear < clearance.forward {
                    clearance.forward = clear;
                    clearance.leading = Some(obstacle.id());
                }
            } else {
                let clear = -gap - body;
                if clear < clearance.backward {
                    clearance.backward = clear;
                    clearance.following = Some(obstacle.id());
                }
            }
        }
        clearance
    }

    fn obstacle_speed(&self, id: Option<i32>) -> Option<f64> {
        id.and_then(|id| self.obstacles.get(id)).map(|o| o.speed())
    }

    fn follow_goal(&self, target_speed: f64, lookahead: f64) -> ManeuverGoal {
        let anchor = (self.ego_sl.s + lookahead).min(self.ref_line.length());
        ManeuverGoal::new(
            DecisionType::FollowLane,
            vec![ManeuverInfo {
                lane_id: self.ref_line.nearest_waypoint(anchor).lane_id,
                has_stop_point: false,
                target_s: anchor,
                target_speed,
                reference_line: Some(Arc::clone(self.ref_line)),
            }],
        )
    }

    fn stop_goal(&self, decision_type: DecisionType, target_s: f64) -> ManeuverGoal {
        ManeuverGoal::new(
            decision_type,
            vec![ManeuverInfo {
                lane_id: self.ref_line.nearest_waypoint(target_s).lane_id,
                has_stop_point: true,
                target_s,
                target_speed: 0.0,
                reference_line: Some(Arc::clone(self.ref_line)),
            }],
        )
    }

    /// Decide from the traffic on the current lane; may escalate into a
    /// lane-change evaluation when the leader is much slower than the ego.
    pub fn obstacle_decision(&self) -> ManeuverGoal {
        let clearance = self.lane_clearance(0);
        let incoming = self
            .ref_line
            .nearest_waypoint((self.ego_sl.s + 5.0).min(self.ref_line.length()));
        let lookahead = (clearance.forward - self.planning.lon_safety_buffer)
            .max(self.planning.min_lookahead_distance)
            .min(self.planning.max_lookahead_distance);
        let line_length = self.ref_line.length();

        let Some(leading_speed) = self.obstacle_speed(clearance.leading) else {
            // free lane: stop at the destination when it is inside the
            // lookahead window, otherwise cruise
            if self.ego_sl.s + lookahead > line_length {
                return self.stop_goal(DecisionType::StopAtDestination, line_length);
            }
            return self.follow_goal(self.planning.target_speed, lookahead);
        };

        if clearance.forward < self.planning.lon_safety_buffer {
            return self.stop_goal(
                DecisionType::EmergencyStop,
                self.ego_sl.s + clearance.forward.max(0.0),
            );
        }

        if self.ego_sl.s + lookahead > line_length {
            return self.stop_goal(DecisionType::StopAtDestination, line_length);
        }

        // a leader beyond the lookahead window does not constrain the lane
        if clearance.forward - self.planning.lon_safety_buffer
            > self.planning.max_lookahead_distance
        {
            return self.follow_goal(self.planning.target_speed, lookahead);
        }

        let capped_speed = leading_speed.min(self.planning.target_speed);
        if 0.3 * self.ego_vel > leading_speed
            && incoming.road_option == crate::reference::RoadOption::LaneFollow
        {
            return self.change_lane_decision(&clearance, &incoming);
        }
        self.follow_goal(capped_speed, lookahead)
    }

    /// Stop at the nearest red stop line inside the lookahead window.
    pub fn traffic_light_decision(&self) -> ManeuverGoal {
        let (left, right) = self.ref_line.lane_width(self.ego_sl.s);
        let lane_width = left + right;
        let mut nearest: Option<f64> = None;
        for light in self.traffic_lights {
            if light.state != TrafficLightState::Red {
                continue;
            }
            let sl = self.ref_line.xy_to_sl(light.stop_line.x, light.stop_line.y);
            if sl.s <= self.ego_sl.s
                || sl.s - self.ego_sl.s > self.planning.max_lookahead_distance
                || sl.l.abs() > lane_width
            {
                continue;
            }
            if nearest.map_or(true, |s| sl.s < s) {
                nearest = Some(sl.s);
            }
        }
        match nearest {
            Some(stop_s) => {
                let target_s =
                    (stop_s - self.planning.lon_safety_buffer).max(self.ego_sl.s);
                self.stop_goal(DecisionType::StopAtTrafficSign, target_s)
            }
            None => self.follow_goal(
                self.planning.target_speed,
                self.planning.max_lookahead_distance,
            ),
        }
    }

    fn lane_admissible(&self, clearance: &LaneClearance) -> bool {
        if clearance.backward <= self.maneuver.target_lane_backward_clear_threshold
            || clearance.forward <= self.maneuver.target_lane_forward_clear_threshold
        {
            return false;
        }
        let Some(leading_vel) = self.obstacle_speed(clearance.leading) else {
            return true;
        };
        match self.obstacle_speed(clearance.following) {
            None => leading_vel > self.ego_vel.min(self.planning.target_speed),
            Some(following_vel) => {
                following_vel < self.planning.target_speed.min(leading_vel)
            }
        }
    }

    /// Left target lane id keeps the sign convention of signed lane ids.
    fn left_lane_id(lane_id: i32) -> i32 {
        if lane_id < 0 {
            lane_id + 1
        } else {
            lane_id - 1
        }
    }

    fn right_lane_id(lane_id: i32) -> i32 {
        if lane_id < 0 {
            lane_id - 1
        } else {
            lane_id + 1
        }
    }

    fn change_goal(
        &self,
        decision_type: DecisionType,
        incoming: &WayPoint,
        current_speed: f64,
        target_speed: f64,
    ) -> ManeuverGoal {
        let target_lane_id = match decision_type {
            DecisionType::ChangeLeft => Self::left_lane_id(incoming.lane_id),
            _ => Self::right_lane_id(incoming.lane_id),
        };
        ManeuverGoal::new(
            decision_type,
            vec![
                ManeuverInfo {
                    lane_id: incoming.lane_id,
                    has_stop_point: false,
                    target_s: 0.0,
                    target_speed: current_speed.min(self.planning.target_speed),
                    reference_line: Some(Arc::clone(self.ref_line)),
                },
                ManeuverInfo {
                    lane_id: target_lane_id,
                    has_stop_point: false,
                    target_s: 0.0,
                    target_speed: target_speed.min(self.planning.target_speed),
                    // the target lane reference line is attached by the
                    // maneuver planner
                    reference_line: None,
                },
            ],
        )
    }

    fn change_lane_decision(
        &self,
        current: &LaneClearance,
        incoming: &WayPoint,
    ) -> ManeuverGoal {
        let current_leading_vel = self
            .obstacle_speed(current.leading)
            .unwrap_or(self.planning.target_speed);

        // the ego's own lane must leave room to merge out of
        if current.forward < self.maneuver.forward_clear_threshold
            || current.backward < self.maneuver.backward_clear_threshold
        {
            return self.follow_goal(
                current_leading_vel.min(self.planning.target_speed),
                self.planning.min_lookahead_distance,
            );
        }

        let left_permitted = incoming.lane_change.allows_left() && incoming.has_left_lane;
        let right_permitted = incoming.lane_change.allows_right() && incoming.has_right_lane;
        let left_clearance = left_permitted.then(|| self.lane_clearance(-1));
        let right_clearance = right_permitted.then(|| self.lane_clearance(1));

        let can_change_left = left_clearance
            .as_ref()
            .map_or(false, |c| self.lane_admissible(c));
        let can_change_right = right_clearance
            .as_ref()
            .map_or(false, |c| self.lane_admissible(c));

        match (can_change_left, can_change_right) {
            (false, false) => self.follow_goal(
                current_leading_vel.min(self.planning.target_speed),
                self.planning.min_lookahead_distance,
            ),
            (true, false) => {
                let left = left_clearance.expect("left clearance computed");
                let left_vel = self
                    .obstacle_speed(left.leading)
                    .unwrap_or(self.planning.target_speed);
                self.change_goal(
                    DecisionType::ChangeLeft,
                    incoming,
                    current_leading_vel,
                    left_vel,
                )
            }
            (false, true) => {
                let right = right_clearance.expect("right clearance computed");
                let right_vel = self
                    .obstacle_speed(right.leading)
                    .unwrap_or(self.planning.target_speed);
                self.change_goal(
                    DecisionType::ChangeRight,
                    incoming,
                    current_leading_vel,
                    right_vel,
                )
            }
            (true, true) => {
                let left = left_clearance.expect("left clearance computed");
                let right = right_clearance.expect("right clearance computed");
                let lane_state = |clearance: &LaneClearance| LaneState {
                    leading_vel: self
                        .obstacle_speed(clearance.leading)
                        .unwrap_or(self.planning.target_speed),
                    following_vel: self
                        .obstacle_speed(clearance.following)
                        .unwrap_or(self.planning.target_speed),
                    forward_clear: clearance.forward,
                    backward_clear: clearance.backward,
                };
                let lanes = [lane_state(&left), lane_state(current), lane_state(&right)];
                match select_lane(self.maneuver, self.planning, self.ego_vel, &lanes) {
                    -1 => self.change_goal(
                        DecisionType::ChangeLeft,
                        incoming,
                        current_leading_vel,
                        lanes[0].leading_vel,
                    ),
                    1 => self.change_goal(
                        DecisionType::ChangeRight,
                        incoming,
                        current_leading_vel,
                        lanes[2].leading_vel,
                    ),
                    _ => self.follow_goal(
                        current_leading_vel.min(self.planning.target_speed),
                        self.planning.min_lookahead_distance,
                    ),
                }
            }
        }
    }
}

/// Score the lanes `[left, current, right]` and return the offset
/// (-1, 0, +1) with the lowest weighted cost.
pub fn select_lane(
    maneuver: &ManeuverSection,
    planning: &PlanningSection,
    ego_vel: f64,
    lanes: &[LaneState; 3],
) -> i32 {
    let mut best_offset = 0;
    let mut best_cost = f64::INFINITY;
    for (i, lane) in lanes.iter().enumerate() {
        let cost = maneuver.safety_cost_gain
            * safety_cost(
                maneuver,
                lane.leading_vel,
                lane.following_vel,
                lane.forward_clear,
                lane.backward_clear,
            )
            + maneuver.efficiency_cost_gain
                * efficiency_cost(
                    planning.target_speed,
                    lane.leading_vel,
                    planning.max_lon_velocity,
                )
            + maneuver.comfort_cost_gain
                * comfort_cost(planning, ego_vel, lane.leading_vel, lane.forward_clear);
        let offset = i as i32 - 1;
        // strict inequality keeps the current lane on ties
        if cost < best_cost || (offset == 0 && cost <= best_cost) {
            best_cost = cost;
            best_offset = offset;
        }
    }
    best_offset
}

/// Shrinking gap on the target lane over the change execution time.
pub fn safety_cost(
    maneuver: &ManeuverSection,
    leading_vel: f64,
    following_vel: f64,
    forward_clear: f64,
    backward_clear: f64,
) -> f64 {
    let clear_length = forward_clear + backward_clear;
    let drift = (leading_vel - following_vel) * maneuver.execute_time_length;
    let min_clear_length = (clear_length + drift).max(1e-3);
    let clear_length_threshold = maneuver.target_lane_forward_clear_threshold
        + maneuver.target_lane_backward_clear_threshold;
    clear_length_threshold / min_clear_length.min(clear_length_threshold)
}

/// Deviation of the achievable speed from the desired speed.
pub fn efficiency_cost(target_vel: f64, leading_vel: f64, max_vel: f64) -> f64 {
    let vel_buffer = (max_vel - target_vel).max(0.2);
    let desired_vel = max_vel - vel_buffer;
    if leading_vel < desired_vel {
        (desired_vel - leading_vel) / desired_vel
    } else if leading_vel < max_vel {
        (leading_vel - desired_vel) / vel_buffer
    } else {
        f64::INFINITY
    }
}

/// Acceleration needed to match the leader inside the available gap.
pub fn comfort_cost(
    planning: &PlanningSection,
    ego_vel: f64,
    leading_vel: f64,
    forward_clear: f64,
) -> f64 {
    let gap = (forward_clear - planning.lon_safety_buffer).max(1e-3);
    let acc = (leading_vel * leading_vel - ego_vel * ego_vel) / (2.0 * gap);
    if acc.abs() > planning.max_lon_acc {
        f64::INFINITY
    } else {
        acc.abs() / planning.max_lon_acc
    }
}
