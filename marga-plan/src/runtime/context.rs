//! Immutable per-tick view of the world.

use super::registry::LatestPerception;
use crate::config::VehicleParams;
use crate::error::{PlanningError, Result};
use crate::io::messages::TrafficLightStatus;
use crate::world::{ObstacleSnapshot, VehicleGeometry, VehicleState};

/// Everything one planning tick reads, built once from the registry
/// snapshot and then shared read-only.
pub struct PlanningContext {
    pub vehicle: VehicleState,
    pub obstacles: ObstacleSnapshot,
    pub traffic_lights: Vec<TrafficLightStatus>,
    pub timestamp: f64,
}

impl PlanningContext {
    /// Assemble the tick context. Fails with `InvalidInput` when the ego
    /// messages are missing or non-finite; the tick is skipped in that
    /// case.
    pub fn from_snapshot(snapshot: &LatestPerception, params: &VehicleParams) -> Result<Self> {
        let status = snapshot
            .ego_status
            .as_ref()
            .ok_or_else(|| PlanningError::InvalidInput("no ego vehicle status yet".into()))?;
        let odometry = snapshot
            .odometry
            .as_ref()
            .ok_or_else(|| PlanningError::InvalidInput("no odometry yet".into()))?;

        if !odometry.pose.x.is_finite()
            || !odometry.pose.y.is_finite()
            || !odometry.pose.yaw.is_finite()
            || !status.velocity.is_finite()
        {
            return Err(PlanningError::InvalidInput(
                "non-finite ego state".into(),
            ));
        }

        let mut geometry = VehicleGeometry::from_params(params);
        if let Some(info) = &snapshot.ego_info {
            geometry = geometry.with_info(info);
        }
        let vehicle = VehicleState::from_messages(status, odometry, geometry);

        Ok(Self {
            vehicle,
            obstacles: ObstacleSnapshot::from_objects(&snapshot.objects),
            traffic_lights: snapshot.traffic_lights.clone(),
            timestamp: status.header.stamp,
        })
    }
}
