//! # Marga-Plan: Maneuver Decision and Frenet-Lattice Motion Planning
//!
//! The decision-and-motion core of an autonomous driving stack's local
//! planner. Each planning tick takes the ego kinodynamic state, a lane
//! centerline with curvature and a set of predicted dynamic obstacles,
//! decides a maneuver (follow lane, change lane, stop, emergency stop) and
//! synthesizes a smooth, collision-free, dynamically feasible trajectory
//! for the next few seconds.
//!
//! ## Architecture
//!
//! - [`core`]: angular math, kinodynamic state, trajectories, oriented
//!   boxes with the separating-axis overlap test
//! - [`reference`]: cubic-spline resampled reference line with SL queries
//! - [`frenet`]: Cartesian ⇄ Frenet state transformer under curvature
//! - [`lattice`]: polynomials, end-condition sampling, ST graph, collision
//!   checking, candidate selection
//! - [`maneuver`]: lane clearances, lane-selection costs, state machine
//! - [`world`]: obstacle and ego vehicle models built from messages
//! - [`io`]: ingress message types and the route service interface
//! - [`runtime`]: perception registry, per-tick context, planning node
//!
//! ## Data Flow
//!
//! ```text
//!   perception / odometry            route service
//!            │                            │
//!            ▼                            ▼
//!   PerceptionRegistry ──snapshot──► ReferenceLine (windowed)
//!            │                            │
//!            ▼                            ▼
//!      PlanningContext ───────► ManeuverPlanner ──► ManeuverGoal
//!                                         │
//!                                         ▼
//!                              FrenetLatticePlanner
//!                     (sampler → polynomials → cost heap →
//!                      feasibility → collision check)
//!                                         │
//!                                         ▼
//!                                    Trajectory
//! ```
//!
//! Every tick emits a valid trajectory; when no candidate survives the
//! feasibility and collision filters, a constant-deceleration emergency
//! stop profile is emitted instead.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use marga_plan::config::PlanningConfig;
//! use marga_plan::io::messages::Pose;
//! use marga_plan::io::route::StaticRouteService;
//! use marga_plan::reference::WayPoint;
//! use marga_plan::runtime::{PerceptionRegistry, PlanningNode};
//!
//! let waypoints: Vec<WayPoint> = (0..=100)
//!     .map(|i| WayPoint { x: i as f64 * 5.0, y: 0.0, ..WayPoint::default() })
//!     .collect();
//! let destination = Pose { x: 500.0, y: 0.0, z: 0.0, yaw: 0.0 };
//! let mut node = PlanningNode::new(
//!     PlanningConfig::default(),
//!     Box::new(StaticRouteService::new(waypoints)),
//!     Arc::new(PerceptionRegistry::new()),
//!     destination,
//! ).unwrap();
//! // feed node.registry() from the message callbacks, then each tick:
//! let trajectory = node.tick(0.0);
//! println!("planned {} points", trajectory.len());
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod frenet;
pub mod io;
pub mod lattice;
pub mod maneuver;
pub mod reference;
pub mod runtime;
pub mod world;

pub use config::PlanningConfig;
pub use core::{KinoDynamicState, PathPoint, Trajectory, TrajectoryPoint};
pub use error::{PlanningError, Result};
