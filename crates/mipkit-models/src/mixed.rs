use mipkit_solver::{ConstraintOp, LinearExpr, MipProblem, Solver};
use tracing::{info, warn};

use crate::criteria::PayoffMatrix;
use crate::error::ModelError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixedFormulation {
    /// Maximise `v` with every state's expected payoff `>= v`. Always feasible;
    /// `v` at the optimum is the value of the game.
    #[default]
    Minimax,
    /// Every state's expected payoff `== q`. Infeasible whenever no
    /// non-negative equalizing mix exists.
    Equalizing,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MixedStrategy {
    pub formulation: MixedFormulation,
    /// Probability of playing each strategy
    pub probabilities: Vec<f64>,
    /// Guaranteed expected payoff
    pub value: f64,
    /// Expected payoff of the mix against each state
    pub expected_payoffs: Vec<f64>,
}

pub fn mixed_strategy(
    matrix: &PayoffMatrix,
    formulation: MixedFormulation,
    solver: &Solver,
) -> Result<MixedStrategy, ModelError> {
    let mut problem = MipProblem::new();
    let p: Vec<_> = (0..matrix.num_strategies())
        .map(|i| problem.continuous(format!("p{}", i + 1), 0.0, 1.0))
        .collect();
    let v = problem.continuous("value", f64::NEG_INFINITY, f64::INFINITY);

    problem.add_constraint("probabilities_sum", LinearExpr::sum(p.iter().copied()), ConstraintOp::Eq, 1.0);

    let op = match formulation {
        MixedFormulation::Minimax => ConstraintOp::Ge,
        MixedFormulation::Equalizing => ConstraintOp::Eq,
    };
    for (j, state) in matrix.states().iter().enumerate() {
        let expected = LinearExpr::weighted(p.iter().enumerate().map(|(i, &pi)| (pi, matrix.payoff(i, j))));
        problem.add_constraint(format!("against {state}"), expected, op, v);
    }
    problem.maximize(v);

    let solution = solver.solve(&problem);
    if !solution.is_optimal() {
        warn!(?formulation, status = %solution.status, "mixed strategy not solved");
        return Err(ModelError::NotOptimal {
            status: solution.status,
        });
    }

    // Clamp solver noise so the mix is a proper distribution
    let probabilities: Vec<f64> = p.iter().map(|&pi| solution.value(pi).max(0.0)).collect();
    let expected_payoffs = (0..matrix.num_states())
        .map(|j| {
            probabilities
                .iter()
                .enumerate()
                .map(|(i, pi)| pi * matrix.payoff(i, j))
                .sum()
        })
        .collect();
    let value = solution.value(v);
    info!(?formulation, value, ?probabilities, "mixed strategy solved");

    Ok(MixedStrategy {
        formulation,
        probabilities,
        value,
        expected_payoffs,
    })
}
