// src/motion/mod.rs - Trajectory generators and the factory that builds them
pub mod clothoid;
pub mod factory;
pub mod path;
pub mod trajectory;

pub use factory::{TrajSpec, TrajectoryKind, build_from_value, build_trajectory};
pub use trajectory::{Sample, Trajectory, TrajectoryGenerator};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    #[error("unsupported trajectory type: {0}")]
    Unsupported(String),
    #[error("invalid trajectory parameters: {0}")]
    InvalidParameters(String),
    #[error("{kind} requires at least 2 waypoints, got {got}")]
    TooFewPoints { kind: &'static str, got: usize },
}
