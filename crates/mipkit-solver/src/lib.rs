mod backend;
mod error;
mod problem;
mod solution;

pub use backend::{Backend, Solver};
pub use error::SolverError;
pub use problem::{Constraint, ConstraintOp, LinearExpr, MipProblem, Objective, ProblemDefect, VarId, VarKind, Variable};
pub use solution::{ConstraintViolation, Solution, SolutionStatus};
