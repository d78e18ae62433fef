//! Integral ceiling proxy: an integer count bounded below by `load / capacity`.
//!
//! Only the lower bound `count >= load / capacity` is imposed. The count equals
//! `ceil(load / capacity)` at an optimum only when something pushes it down, i.e. the
//! count carries a strictly positive weight in a minimised cost (or a negative weight in
//! a maximised profit). Without that pressure any larger integer is equally feasible.

use mipkit_solver::{ConstraintOp, LinearExpr, MipProblem, VarId};

use crate::error::ModelError;

/// Add an integer variable `name` with `capacity * name >= load`
pub fn add_ceiling_proxy(
    problem: &mut MipProblem,
    name: &str,
    load: impl Into<LinearExpr>,
    capacity: f64,
) -> Result<VarId, ModelError> {
    if !capacity.is_finite() || capacity <= 0.0 {
        return Err(ModelError::InvalidCapacity(name.to_string()));
    }

    let count = problem.integer(name, 0.0, f64::INFINITY);
    problem.add_constraint(format!("{name}_covers_load"), count * capacity, ConstraintOp::Ge, load);
    Ok(count)
}
