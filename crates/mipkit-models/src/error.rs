use mipkit_solver::{SolutionStatus, SolverError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid tier schedule: {0}")]
    InvalidTiers(String),
    #[error("Free-fill tiering of {0} needs non-decreasing rates; use ordered fill")]
    FreeFillRequiresConvexTiers(String),
    #[error("Invalid operating band [{low}, {high}]")]
    InvalidBand { low: f64, high: f64 },
    #[error("Capacity of {0} must be positive and finite")]
    InvalidCapacity(String),
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: String, value: f64 },
    #[error("Invalid payoff matrix: {0}")]
    InvalidMatrix(String),
    #[error("Optimism coefficient must lie in [0, 1], got {0}")]
    InvalidOptimism(f64),
    #[error("Invalid state distribution: {0}")]
    InvalidDistribution(String),
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
    #[error("The problem does not have an optimal solution (status {status})")]
    NotOptimal { status: SolutionStatus },
}
