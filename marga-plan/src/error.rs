//! Error types for the planning stack.

use thiserror::Error;

/// Planning error type.
///
/// Candidate-level failures (`GeometrySingular`, `InfeasibleTrajectory`) are
/// recovered locally by dropping the candidate; the remaining kinds decide
/// what a tick emits (see the propagation policy on [`crate::runtime`]).
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("frenet geometry singular: {0}")]
    GeometrySingular(String),

    #[error("no dynamically feasible trajectory candidate")]
    InfeasibleTrajectory,

    #[error("all trajectory candidates collide")]
    Collision,

    #[error("route service unavailable: {0}")]
    RouteUnavailable(String),

    #[error("tick deadline exceeded")]
    Deadline,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for PlanningError {
    fn from(e: toml::de::Error) -> Self {
        PlanningError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlanningError>;
