use crate::problem::{MipProblem, VarId};

/// The result of solving a [`MipProblem`]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable, indexed by [`VarId::index`]
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The time budget ran out before the backend reported a result
    TimedOut,
    /// Solver encountered an error
    Error,
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolutionStatus::Optimal => "OPTIMAL",
            SolutionStatus::Infeasible => "INFEASIBLE",
            SolutionStatus::Unbounded => "UNBOUNDED",
            SolutionStatus::TimedOut => "TIMED_OUT",
            SolutionStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Information about a violated constraint or bound
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
        }
    }

    /// A solution carrying only a non-optimal status
    pub fn failed(status: SolutionStatus) -> Self {
        let objective_value = match status {
            SolutionStatus::Unbounded => f64::NEG_INFINITY,
            _ => f64::INFINITY,
        };
        Self {
            status,
            values: Vec::new(),
            objective_value,
        }
    }

    pub fn infeasible() -> Self {
        Self::failed(SolutionStatus::Infeasible)
    }

    pub fn unbounded() -> Self {
        Self::failed(SolutionStatus::Unbounded)
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Solved value of a variable, `0.0` when no values are available
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    /// `(name, value)` for every variable of the problem that produced this solution
    pub fn named_values<'a>(&'a self, problem: &'a MipProblem) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        problem
            .variables
            .iter()
            .zip(&self.values)
            .map(|(v, &value)| (v.name.as_str(), value))
    }
}
