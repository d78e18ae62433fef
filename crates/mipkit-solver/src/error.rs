use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("Unknown solver backend: {0}")]
    UnknownBackend(String),
    #[error("Solver backend '{0}' is not available in this build")]
    BackendUnavailable(String),
}
