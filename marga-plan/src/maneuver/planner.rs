//! Maneuver planner: runs the per-tick decisions, attaches reference lines
//! and advances the state machine.

use std::sync::Arc;

use super::decision::DecisionContext;
use super::goal::{combine_maneuver, DecisionType, ManeuverGoal};
use super::state::ManeuverState;
use crate::reference::{ReferenceLine, WayPoint};

/// Long-lived maneuver state machine driven once per tick.
#[derive(Default)]
pub struct ManeuverPlanner {
    state: ManeuverState,
}

impl ManeuverPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ManeuverState {
        self.state
    }

    /// Evaluate the tick's decisions, combine them, attach the target-lane
    /// reference line for lane changes and advance the state machine.
    ///
    /// `route_waypoints` is the waypoint window the current reference line
    /// was built from; the target lane line is its lateral offset.
    pub fn update(
        &mut self,
        ctx: &DecisionContext<'_>,
        route_waypoints: &[WayPoint],
        resolution: f64,
    ) -> ManeuverGoal {
        let traffic_goal = ctx.traffic_light_decision();
        let obstacle_goal = ctx.obstacle_decision();
        let mut combined = combine_maneuver(traffic_goal, obstacle_goal);

        if matches!(
            combined.decision_type,
            DecisionType::ChangeLeft | DecisionType::ChangeRight
        ) {
            let (left, right) = ctx.ref_line.lane_width(ctx.ego_sl.s);
            let lane_width = left + right;
            let offset = match combined.decision_type {
                DecisionType::ChangeLeft => lane_width,
                _ => -lane_width,
            };
            match Self::offset_reference_line(route_waypoints, offset, resolution) {
                Ok(target_line) => {
                    if let Some(target) = combined.infos.get_mut(1) {
                        target.reference_line = Some(target_line);
                    }
                }
                Err(e) => {
                    log::warn!(
                        "target lane reference line failed ({}), keeping lane",
                        e
                    );
                    combined.decision_type = DecisionType::FollowLane;
                    combined.infos.truncate(1);
                }
            }
        }

        self.state = self.state.transition(combined.decision_type);
        combined
    }

    /// Centerline of the adjacent lane: every waypoint shifted along its
    /// left normal by `offset` (left positive).
    fn offset_reference_line(
        waypoints: &[WayPoint],
        offset: f64,
        resolution: f64,
    ) -> crate::error::Result<Arc<ReferenceLine>> {
        let shifted: Vec<WayPoint> = waypoints
            .iter()
            .map(|wp| {
                let mut out = *wp;
                out.x = wp.x - wp.theta.sin() * offset;
                out.y = wp.y + wp.theta.cos() * offset;
                out
            })
            .collect();
        Ok(Arc::new(ReferenceLine::from_waypoints(
            &shifted, resolution,
        )?))
    }
}
