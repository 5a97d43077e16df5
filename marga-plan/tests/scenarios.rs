//! End-to-end planning scenarios on synthetic roads.

mod common;

use marga_plan::core::{Box2d, Trajectory, Vec2};
use marga_plan::maneuver::ManeuverState;
use marga_plan::reference::LaneChange;
use marga_plan::world::Obstacle;

/// Emitted-trajectory invariants every scenario must satisfy.
fn assert_trajectory_invariants(trajectory: &Trajectory, config: &marga_plan::PlanningConfig) {
    assert!(trajectory.is_time_monotone(), "relative_time not monotone");
    for point in &trajectory.points {
        assert!(
            point.v.abs() <= config.planning.max_lon_velocity + 1e-6,
            "velocity bound violated: {}",
            point.v
        );
        assert!(
            point.a <= config.planning.max_lon_acc + 1e-6
                && point.a >= -config.planning.max_lon_decel - 1e-6,
            "acceleration bound violated: {}",
            point.a
        );
        assert!(
            point.path_point.kappa.abs() <= config.planning.max_kappa + 1e-6,
            "curvature bound violated: {}",
            point.path_point.kappa
        );
    }
    // no two points coincide in (t, x, y)
    for pair in trajectory.points.windows(2) {
        let same_pos = (pair[0].path_point.x - pair[1].path_point.x).abs() < 1e-9
            && (pair[0].path_point.y - pair[1].path_point.y).abs() < 1e-9;
        let standing = pair[0].v.abs() < 1e-6;
        assert!(!same_pos || standing, "coincident moving points");
    }
}

#[test]
fn test_s1_straight_empty_road_accelerates_to_cruise() {
    let config = common::test_config();
    let mut node = common::make_node(
        common::straight_route(500.0, LaneChange::None),
        config.clone(),
    );
    let delta_t = config.planning.delta_t;
    let trajectories = common::run_sim(&mut node, (0.0, 0.0, 0.0, 0.0), |_| Vec::new(), 100, delta_t);

    assert_eq!(node.maneuver_state(), ManeuverState::FollowLane);
    for trajectory in &trajectories {
        assert_trajectory_invariants(trajectory, &config);
        // never leaves the centerline on a straight empty road
        for point in &trajectory.points {
            assert!(
                point.path_point.y.abs() < 0.05,
                "lateral offset {} too large",
                point.path_point.y
            );
        }
    }
    // the closed-loop ego approaches the 10 m/s target within the horizon
    let final_v = trajectories.last().unwrap().points[1].v;
    assert!(
        final_v > 9.0,
        "ego should approach 10 m/s after 10 s, got {:.2}",
        final_v
    );
}

#[test]
fn test_s2_emergency_stop_behind_stopped_leader() {
    let config = common::test_config();
    let mut node = common::make_node(
        common::straight_route(500.0, LaneChange::None),
        config.clone(),
    );
    let registry = node.registry();
    common::publish_ego(&registry, 50.0, 0.0, 0.0, 5.0, 0.0);
    // center-to-center 8 m; bumper gap 3.65 m < 5 m safety buffer
    registry.update_objects(vec![common::vehicle_object(1, 58.0, 0.0, 0.0)]);

    let trajectory = node.tick(0.0);

    assert_eq!(node.maneuver_state(), ManeuverState::EmergencyStop);
    assert!(trajectory.points.iter().all(|p| p.a <= 0.0));
    let mut prev_v = f64::MAX;
    for point in &trajectory.points {
        assert!(point.v <= prev_v + 1e-9, "velocity must not increase");
        prev_v = point.v;
    }
    let stop_time = trajectory
        .points
        .iter()
        .find(|p| p.v == 0.0)
        .expect("reaches standstill")
        .relative_time;
    assert!(stop_time <= 2.0, "stops within 2 s, got {:.2}", stop_time);
}

#[test]
fn test_s3_changes_left_around_slow_leader() {
    let config = common::test_config();
    let mut node = common::make_node(
        common::straight_route(500.0, LaneChange::Both),
        config.clone(),
    );
    let registry = node.registry();
    common::publish_ego(&registry, 50.0, 0.0, 0.0, 10.0, 0.0);
    // slow leader 40 m ahead, right lane blocked close behind a parked car
    let objects = vec![
        common::vehicle_object(1, 90.0, 0.0, 2.0),
        common::vehicle_object(2, 56.0, -3.5, 0.0),
    ];
    registry.update_objects(objects.clone());

    let trajectory = node.tick(0.0);

    assert_eq!(node.maneuver_state(), ManeuverState::ChangeLeftLane);
    assert_trajectory_invariants(&trajectory, &config);
    let terminal = trajectory.points.last().unwrap();
    assert!(
        (terminal.path_point.y - 3.5).abs() < 0.6,
        "ends on the left lane centerline, got y={:.2}",
        terminal.path_point.y
    );

    // independent SAT verification against the raw predicted boxes
    let obstacles: Vec<Obstacle> = objects.iter().map(Obstacle::from_object).collect();
    for point in &trajectory.points {
        let theta = point.path_point.theta;
        let mut ego_box = Box2d::new(
            Vec2::new(point.path_point.x, point.path_point.y),
            theta,
            config.vehicle.length,
            config.vehicle.width,
        );
        ego_box.shift(Vec2::new(
            config.vehicle.back_axle_to_center_length * theta.cos(),
            config.vehicle.back_axle_to_center_length * theta.sin(),
        ));
        for obstacle in &obstacles {
            let predicted = obstacle.point_at(point.relative_time);
            let obstacle_box = obstacle.bounding_box_at(&predicted);
            assert!(
                !ego_box.has_overlap(&obstacle_box),
                "overlap with obstacle {} at t={:.1}",
                obstacle.id(),
                point.relative_time
            );
        }
    }
}

#[test]
fn test_s4_stops_at_destination() {
    let config = common::test_config();
    let mut node = common::make_node(
        common::straight_route(30.0, LaneChange::None),
        config.clone(),
    );
    let registry = node.registry();
    common::publish_ego(&registry, 20.0, 0.0, 0.0, 5.0, 0.0);

    let trajectory = node.tick(0.0);

    assert_eq!(node.maneuver_state(), ManeuverState::Stop);
    assert_trajectory_invariants(&trajectory, &config);
    let terminal = trajectory.points.last().unwrap();
    assert!(terminal.v.abs() < 0.3, "terminal v {:.2} not ~0", terminal.v);
    assert!(
        (terminal.path_point.x - 30.0).abs() < 2.0,
        "stops near s=30, got {:.2}",
        terminal.path_point.x
    );
}

#[test]
fn test_s5_frenet_known_values_round_trip() {
    use marga_plan::frenet::{cartesian_to_frenet, frenet_to_cartesian, CartesianState};
    use marga_plan::reference::ReferencePoint;

    let ref_point = ReferencePoint {
        x: 0.0,
        y: 0.0,
        theta: 0.0,
        kappa: 0.1,
        dkappa: 0.0,
        s: 0.0,
    };
    let state = CartesianState {
        x: 0.0,
        y: 1.0,
        theta: 0.0,
        kappa: 0.0,
        v: 5.0,
        a: 0.0,
    };
    let (s_cond, d_cond) = cartesian_to_frenet(&ref_point, &state).unwrap();
    assert!((d_cond[0] - 1.0).abs() < 1e-12);
    assert!((s_cond[0] - 0.0).abs() < 1e-12);
    assert!((d_cond[1] - 0.0).abs() < 1e-12);
    assert!((s_cond[1] - 5.0 / 0.9).abs() < 1e-9);

    let back = frenet_to_cartesian(&ref_point, &s_cond, &d_cond).unwrap();
    assert!((back.x - state.x).abs() < 1e-6);
    assert!((back.y - state.y).abs() < 1e-6);
    assert!((back.theta - state.theta).abs() < 1e-6);
    assert!((back.v - state.v).abs() < 1e-6);
    assert!((back.a - state.a).abs() < 1e-6);
}

#[test]
fn test_s6_oriented_box_overlap() {
    let a = Box2d::new(Vec2::new(0.0, 0.0), 0.0, 4.0, 2.0);
    let b = Box2d::new(Vec2::new(3.0, 1.1), std::f64::consts::FRAC_PI_4, 4.0, 2.0);
    assert!(a.has_overlap(&b));

    let mut shifted = b;
    shifted.shift(Vec2::new(0.5, 1.5));
    assert!(!a.has_overlap(&shifted));
}

#[test]
fn test_follow_behind_leader_when_change_forbidden() {
    // the lane-change trigger fires but no adjacent lane is permitted:
    // the planner must settle behind the leader, collision-free
    let config = common::test_config();
    let mut node = common::make_node(
        common::straight_route(500.0, LaneChange::None),
        config.clone(),
    );
    let delta_t = config.planning.delta_t;
    let leader = |now: f64| vec![common::vehicle_object(1, 90.0 + 2.0 * now, 0.0, 2.0)];
    let trajectories = common::run_sim(&mut node, (50.0, 0.0, 0.0, 10.0), leader, 60, delta_t);

    assert_eq!(node.maneuver_state(), ManeuverState::FollowLane);
    for trajectory in &trajectories {
        assert_trajectory_invariants(trajectory, &config);
    }
    // the ego must have slowed down toward the leader's speed
    let final_v = trajectories.last().unwrap().points[1].v;
    assert!(
        final_v < 7.0,
        "ego should be braking behind the 2 m/s leader, got {:.2} m/s",
        final_v
    );
}
