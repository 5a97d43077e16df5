//! Process-wide store of the latest perception and vehicle messages.
//!
//! Perception callbacks write single messages under the exclusive lock;
//! the planner clones the whole set under the shared lock once per tick
//! and never touches the registry again within the tick.

use parking_lot::RwLock;

use crate::io::messages::{
    EgoVehicleInfo, EgoVehicleStatus, ObjectStatus, Odometry, TrafficLightStatus,
};

/// Latest-value cache of every ingress topic.
#[derive(Clone, Debug, Default)]
pub struct LatestPerception {
    pub ego_status: Option<EgoVehicleStatus>,
    pub ego_info: Option<EgoVehicleInfo>,
    pub odometry: Option<Odometry>,
    pub objects: Vec<ObjectStatus>,
    pub traffic_lights: Vec<TrafficLightStatus>,
}

/// Thread-safe registry shared between message callbacks and the planner.
#[derive(Debug, Default)]
pub struct PerceptionRegistry {
    inner: RwLock<LatestPerception>,
}

impl PerceptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_ego_status(&self, status: EgoVehicleStatus) {
        self.inner.write().ego_status = Some(status);
    }

    pub fn update_ego_info(&self, info: EgoVehicleInfo) {
        self.inner.write().ego_info = Some(info);
    }

    pub fn update_odometry(&self, odometry: Odometry) {
        self.inner.write().odometry = Some(odometry);
    }

    pub fn update_objects(&self, objects: Vec<ObjectStatus>) {
        self.inner.write().objects = objects;
    }

    pub fn update_traffic_lights(&self, lights: Vec<TrafficLightStatus>) {
        self.inner.write().traffic_lights = lights;
    }

    /// Clone the latest messages for one tick.
    pub fn snapshot(&self) -> LatestPerception {
        self.inner.read().clone()
    }
}
