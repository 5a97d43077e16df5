//! Configuration loading for the planning stack.

use crate::error::{PlanningError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure.
#[derive(Clone, Debug, Deserialize)]
pub struct PlanningConfig {
    #[serde(default)]
    pub planning: PlanningSection,
    #[serde(default)]
    pub maneuver: ManeuverSection,
    #[serde(default)]
    pub vehicle: VehicleParams,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

/// Horizon, sampling and feasibility limits for the lattice planner.
#[derive(Clone, Debug, Deserialize)]
pub struct PlanningSection {
    /// Trajectory sampling step (default: 0.1 s)
    #[serde(default = "default_delta_t")]
    pub delta_t: f64,

    /// Collision/prediction lookahead horizon (default: 8.0 s)
    #[serde(default = "default_max_lookahead_time")]
    pub max_lookahead_time: f64,

    /// Lower bound on the spatial planning horizon (default: 10 m)
    #[serde(default = "default_min_lookahead_distance")]
    pub min_lookahead_distance: f64,

    /// Upper bound on the spatial planning horizon (default: 100 m)
    #[serde(default = "default_max_lookahead_distance")]
    pub max_lookahead_distance: f64,

    /// Longitudinal clearance kept to other traffic (default: 5 m)
    #[serde(default = "default_lon_safety_buffer")]
    pub lon_safety_buffer: f64,

    /// Lateral clearance kept to other traffic (default: 0.3 m)
    #[serde(default = "default_lat_safety_buffer")]
    pub lat_safety_buffer: f64,

    /// Cruise speed the planner aims for (default: 10 m/s)
    #[serde(default = "default_target_speed")]
    pub target_speed: f64,

    /// Hard velocity bound for candidate rejection (default: 20 m/s)
    #[serde(default = "default_max_lon_velocity")]
    pub max_lon_velocity: f64,

    /// Hard acceleration bound (default: 2.0 m/s²)
    #[serde(default = "default_max_lon_acc")]
    pub max_lon_acc: f64,

    /// Hard deceleration bound, positive (default: 6.0 m/s²)
    #[serde(default = "default_max_lon_decel")]
    pub max_lon_decel: f64,

    /// Curvature bound for candidate rejection (default: 0.3 1/m)
    #[serde(default = "default_max_kappa")]
    pub max_kappa: f64,

    /// Jerk bound for candidate rejection (default: 8.0 m/s³)
    #[serde(default = "default_max_jerk")]
    pub max_jerk: f64,

    /// Reference line resampling spacing (default: 1.0 m)
    #[serde(default = "default_reference_resolution")]
    pub reference_resolution: f64,

    /// Largest sampled lateral end offset (default: 1.0 m)
    #[serde(default = "default_lateral_offset_max")]
    pub lateral_offset_max: f64,

    /// Lateral end offset grid spacing (default: 0.5 m)
    #[serde(default = "default_lateral_offset_step")]
    pub lateral_offset_step: f64,

    /// Allowed excursion beyond the lane edge before a candidate is
    /// rejected (default: 0.5 m)
    #[serde(default = "default_road_edge_tolerance")]
    pub road_edge_tolerance: f64,

    /// Shortest sampled horizon time (default: 4.0 s)
    #[serde(default = "default_min_horizon_time")]
    pub min_horizon_time: f64,

    /// Horizon time grid spacing up to `max_lookahead_time` (default: 2.0 s)
    #[serde(default = "default_horizon_time_step")]
    pub horizon_time_step: f64,

    /// Cruise speed grid spacing around the target speed (default: 1.0 m/s)
    #[serde(default = "default_speed_sample_step")]
    pub speed_sample_step: f64,

    /// Cruise speed samples on each side of the target (default: 2)
    #[serde(default = "default_speed_sample_count")]
    pub speed_sample_count: usize,

    /// Weight on integrated squared jerk
    #[serde(default = "default_weight_jerk")]
    pub weight_jerk: f64,

    /// Weight on terminal speed deviation
    #[serde(default = "default_weight_speed_deviation")]
    pub weight_speed_deviation: f64,

    /// Weight on integrated squared lateral offset
    #[serde(default = "default_weight_lateral_offset")]
    pub weight_lateral_offset: f64,

    /// Weight on peak centripetal acceleration
    #[serde(default = "default_weight_centripetal")]
    pub weight_centripetal: f64,

    /// Weight on horizon time (prefers reaching the goal sooner)
    #[serde(default = "default_weight_time")]
    pub weight_time: f64,
}

/// Thresholds and cost gains for the maneuver state machine.
#[derive(Clone, Debug, Deserialize)]
pub struct ManeuverSection {
    /// Current-lane forward clearance required before a change (default: 20 m)
    #[serde(default = "default_forward_clear_threshold")]
    pub forward_clear_threshold: f64,

    /// Current-lane backward clearance required before a change (default: 10 m)
    #[serde(default = "default_backward_clear_threshold")]
    pub backward_clear_threshold: f64,

    /// Target-lane forward clearance required (default: 10 m)
    #[serde(default = "default_target_lane_forward_clear_threshold")]
    pub target_lane_forward_clear_threshold: f64,

    /// Target-lane backward clearance required (default: 10 m)
    #[serde(default = "default_target_lane_backward_clear_threshold")]
    pub target_lane_backward_clear_threshold: f64,

    /// Gain on the lane safety cost
    #[serde(default = "default_cost_gain")]
    pub safety_cost_gain: f64,

    /// Gain on the lane efficiency cost
    #[serde(default = "default_cost_gain")]
    pub efficiency_cost_gain: f64,

    /// Gain on the lane comfort cost
    #[serde(default = "default_cost_gain")]
    pub comfort_cost_gain: f64,

    /// Assumed lane-change execution time (default: 5 s)
    #[serde(default = "default_execute_time_length")]
    pub execute_time_length: f64,
}

/// Ego vehicle geometry.
#[derive(Clone, Debug, Deserialize)]
pub struct VehicleParams {
    /// Bounding box length (default: 4.7 m)
    #[serde(default = "default_vehicle_length")]
    pub length: f64,

    /// Bounding box width (default: 1.9 m)
    #[serde(default = "default_vehicle_width")]
    pub width: f64,

    /// Rear axle to geometric center (default: 1.4 m)
    #[serde(default = "default_back_axle_to_center")]
    pub back_axle_to_center_length: f64,
}

/// Execution knobs for the planning node.
#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeSection {
    /// Worker threads for candidate fan-out. 0 disables parallelism.
    #[serde(default)]
    pub threads: usize,

    /// Soft tick deadline; best-so-far is emitted past it (default: 80 ms)
    #[serde(default = "default_tick_deadline_ms")]
    pub tick_deadline_ms: u64,
}

// Default value functions

fn default_delta_t() -> f64 {
    0.1
}
fn default_max_lookahead_time() -> f64 {
    8.0
}
fn default_min_lookahead_distance() -> f64 {
    10.0
}
fn default_max_lookahead_distance() -> f64 {
    100.0
}
fn default_lon_safety_buffer() -> f64 {
    5.0
}
fn default_lat_safety_buffer() -> f64 {
    0.3
}
fn default_target_speed() -> f64 {
    10.0
}
fn default_max_lon_velocity() -> f64 {
    20.0
}
fn default_max_lon_acc() -> f64 {
    2.0
}
fn default_max_lon_decel() -> f64 {
    6.0
}
fn default_max_kappa() -> f64 {
    0.3
}
fn default_max_jerk() -> f64 {
    8.0
}
fn default_reference_resolution() -> f64 {
    1.0
}
fn default_lateral_offset_max() -> f64 {
    1.0
}
fn default_lateral_offset_step() -> f64 {
    0.5
}
fn default_road_edge_tolerance() -> f64 {
    0.5
}
fn default_min_horizon_time() -> f64 {
    4.0
}
fn default_horizon_time_step() -> f64 {
    2.0
}
fn default_speed_sample_step() -> f64 {
    1.0
}
fn default_speed_sample_count() -> usize {
    2
}
fn default_weight_jerk() -> f64 {
    0.1
}
fn default_weight_speed_deviation() -> f64 {
    1.0
}
fn default_weight_lateral_offset() -> f64 {
    1.0
}
fn default_weight_centripetal() -> f64 {
    0.5
}
fn default_weight_time() -> f64 {
    0.1
}

fn default_forward_clear_threshold() -> f64 {
    20.0
}
fn default_backward_clear_threshold() -> f64 {
    10.0
}
fn default_target_lane_forward_clear_threshold() -> f64 {
    10.0
}
fn default_target_lane_backward_clear_threshold() -> f64 {
    10.0
}
fn default_cost_gain() -> f64 {
    1.0
}
fn default_execute_time_length() -> f64 {
    5.0
}

fn default_vehicle_length() -> f64 {
    4.7
}
fn default_vehicle_width() -> f64 {
    1.9
}
fn default_back_axle_to_center() -> f64 {
    1.4
}

fn default_tick_deadline_ms() -> u64 {
    80
}

impl Default for PlanningSection {
    fn default() -> Self {
        Self {
            delta_t: default_delta_t(),
            max_lookahead_time: default_max_lookahead_time(),
            min_lookahead_distance: default_min_lookahead_distance(),
            max_lookahead_distance: default_max_lookahead_distance(),
            lon_safety_buffer: default_lon_safety_buffer(),
            lat_safety_buffer: default_lat_safety_buffer(),
            target_speed: default_target_speed(),
            max_lon_velocity: default_max_lon_velocity(),
            max_lon_acc: default_max_lon_acc(),
            max_lon_decel: default_max_lon_decel(),
            max_kappa: default_max_kappa(),
            max_jerk: default_max_jerk(),
            reference_resolution: default_reference_resolution(),
            lateral_offset_max: default_lateral_offset_max(),
            lateral_offset_step: default_lateral_offset_step(),
            road_edge_tolerance: default_road_edge_tolerance(),
            min_horizon_time: default_min_horizon_time(),
            horizon_time_step: default_horizon_time_step(),
            speed_sample_step: default_speed_sample_step(),
            speed_sample_count: default_speed_sample_count(),
            weight_jerk: default_weight_jerk(),
            weight_speed_deviation: default_weight_speed_deviation(),
            weight_lateral_offset: default_weight_lateral_offset(),
            weight_centripetal: default_weight_centripetal(),
            weight_time: default_weight_time(),
        }
    }
}

impl Default for ManeuverSection {
    fn default() -> Self {
        Self {
            forward_clear_threshold: default_forward_clear_threshold(),
            backward_clear_threshold: default_backward_clear_threshold(),
            target_lane_forward_clear_threshold: default_target_lane_forward_clear_threshold(),
            target_lane_backward_clear_threshold: default_target_lane_backward_clear_threshold(),
            safety_cost_gain: default_cost_gain(),
            efficiency_cost_gain: default_cost_gain(),
            comfort_cost_gain: default_cost_gain(),
            execute_time_length: default_execute_time_length(),
        }
    }
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            length: default_vehicle_length(),
            width: default_vehicle_width(),
            back_axle_to_center_length: default_back_axle_to_center(),
        }
    }
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            threads: 0,
            tick_deadline_ms: default_tick_deadline_ms(),
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            planning: PlanningSection::default(),
            maneuver: ManeuverSection::default(),
            vehicle: VehicleParams::default(),
            runtime: RuntimeSection::default(),
        }
    }
}

impl PlanningConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlanningError::Config(format!("failed to read config file: {}", e)))?;
        let config: PlanningConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the planner cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.planning.delta_t <= 0.0 {
            return Err(PlanningError::Config("planning.delta_t must be > 0".into()));
        }
        if self.planning.min_horizon_time > self.planning.max_lookahead_time {
            return Err(PlanningError::Config(
                "planning.min_horizon_time exceeds max_lookahead_time".into(),
            ));
        }
        if self.planning.min_lookahead_distance > self.planning.max_lookahead_distance {
            return Err(PlanningError::Config(
                "planning.min_lookahead_distance exceeds max_lookahead_distance".into(),
            ));
        }
        if self.vehicle.length <= 0.0 || self.vehicle.width <= 0.0 {
            return Err(PlanningError::Config(
                "vehicle dimensions must be positive".into(),
            ));
        }
        Ok(())
    }
}
