//! Marga planning node.
//!
//! Runs the local planner against a built-in simulated scenario: a straight
//! single-lane road with a stopped vehicle part-way down it. The ego tracks
//! its own plans, so the log shows the full sequence without a vehicle
//! stack attached: accelerate to cruise, brake behind the blocked lane and
//! hold a safe standstill gap.

use std::path::Path;
use std::sync::Arc;

use marga_plan::config::PlanningConfig;
use marga_plan::io::messages::{EgoVehicleStatus, ObjectStatus, Odometry, Pose, Vector3};
use marga_plan::io::route::StaticRouteService;
use marga_plan::reference::WayPoint;
use marga_plan::runtime::{PerceptionRegistry, PlanningNode};

const ROUTE_LENGTH: f64 = 400.0;
const SIM_TICKS: usize = 400;
const LEADER_POSITION: f64 = 200.0;

fn route_waypoints() -> Vec<WayPoint> {
    (0..=(ROUTE_LENGTH as usize / 5))
        .map(|i| WayPoint {
            x: i as f64 * 5.0,
            y: 0.0,
            ..WayPoint::default()
        })
        .collect()
}

fn stopped_leader() -> ObjectStatus {
    let mut object = ObjectStatus::default();
    object.id = 1;
    object.pose.x = LEADER_POSITION;
    object.dimensions = Vector3 {
        x: 4.4,
        y: 1.9,
        z: 1.5,
    };
    object
}

fn main() -> marga_plan::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = if args.len() > 1 {
        let path = Path::new(&args[1]);
        log::info!("loading configuration from {:?}", path);
        PlanningConfig::load(path)?
    } else if Path::new("marga.toml").exists() {
        log::info!("loading configuration from marga.toml");
        PlanningConfig::load(Path::new("marga.toml"))?
    } else {
        log::info!("using default configuration");
        PlanningConfig::default()
    };

    log::info!(
        "marga-plan v{} (delta_t {:.2}s, lookahead {:.0}s, {} worker threads)",
        env!("CARGO_PKG_VERSION"),
        config.planning.delta_t,
        config.planning.max_lookahead_time,
        config.runtime.threads,
    );

    let delta_t = config.planning.delta_t;
    let destination = Pose {
        x: ROUTE_LENGTH,
        y: 0.0,
        z: 0.0,
        yaw: 0.0,
    };
    let registry = Arc::new(PerceptionRegistry::new());
    let mut node = PlanningNode::new(
        config,
        Box::new(StaticRouteService::new(route_waypoints())),
        Arc::clone(&registry),
        destination,
    )?;

    // scripted world: ego at rest at the origin, stopped traffic ahead
    let mut ego_x: f64 = 0.0;
    let mut ego_y: f64 = 0.0;
    let mut ego_yaw: f64 = 0.0;
    let mut ego_v: f64 = 0.0;

    for tick in 0..SIM_TICKS {
        let now = tick as f64 * delta_t;

        let mut status = EgoVehicleStatus::default();
        status.velocity = ego_v;
        status.header.stamp = now;
        registry.update_ego_status(status);
        let mut odometry = Odometry::default();
        odometry.pose.x = ego_x + 1.4 * ego_yaw.cos();
        odometry.pose.y = ego_y + 1.4 * ego_yaw.sin();
        odometry.pose.yaw = ego_yaw;
        registry.update_odometry(odometry);
        registry.update_objects(vec![stopped_leader()]);

        let trajectory = node.tick(now);

        // the ego tracks its own plan perfectly: advance one step
        if let Some(next) = trajectory.points.get(1) {
            ego_x = next.path_point.x;
            ego_y = next.path_point.y;
            ego_yaw = next.path_point.theta;
            ego_v = next.v;
        }

        if tick % 10 == 0 {
            log::info!(
                "t={:5.1}s state={:<13} ego=({:6.1}, {:5.1}) v={:4.1} m/s plan={} pts",
                now,
                node.maneuver_state().name(),
                ego_x,
                ego_y,
                ego_v,
                trajectory.len(),
            );
        }
        if ego_v < 0.05 && ego_x > LEADER_POSITION - 30.0 {
            log::info!(
                "holding {:.1} m behind stopped traffic at t={:.1}s",
                LEADER_POSITION - ego_x,
                now
            );
            break;
        }
    }

    Ok(())
}
