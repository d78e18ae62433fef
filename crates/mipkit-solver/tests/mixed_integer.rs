use mipkit_solver::{ConstraintOp, LinearExpr, MipProblem, SolutionStatus, Solver, VarKind};

#[test]
fn knapsack_with_booleans_picks_best_subset() {
    // weights 5, 4, 3; values 10, 40, 30; capacity 7 -> items 1 and 2 (value 70)
    let weights = [5.0, 4.0, 3.0];
    let worth = [10.0, 40.0, 30.0];

    let mut problem = MipProblem::new();
    let picks: Vec<_> = (0..3).map(|i| problem.boolean(format!("pick{i}"))).collect();
    problem.maximize(LinearExpr::weighted(picks.iter().copied().zip(worth)));
    problem.add_constraint(
        "capacity",
        LinearExpr::weighted(picks.iter().copied().zip(weights)),
        ConstraintOp::Le,
        7.0,
    );

    let solution = Solver::new().solve(&problem);

    assert_eq!(solution.status, SolutionStatus::Optimal);
    let chosen: Vec<f64> = picks.iter().map(|&p| solution.value(p)).collect();
    assert_eq!(chosen, vec![0.0, 1.0, 1.0]);
    assert!((solution.objective_value - 70.0).abs() < 1e-6);
    assert!(problem.violations(&solution.values, 1e-6).is_empty());
}

#[test]
fn free_variable_takes_negative_values() {
    let mut problem = MipProblem::new();
    let z = problem.add_variable("z", VarKind::Continuous, f64::NEG_INFINITY, f64::INFINITY);
    problem.minimize(z);
    problem.add_constraint("floor", z, ConstraintOp::Ge, -12.5);

    let solution = Solver::new().solve(&problem);

    assert!(solution.is_optimal());
    assert!((solution.value(z) + 12.5).abs() < 1e-6);
}

#[test]
fn named_values_follow_declaration_order() {
    let mut problem = MipProblem::new();
    let a = problem.continuous("a", 1.0, 1.0);
    let b = problem.integer("b", 0.0, 5.0);
    problem.maximize(a + b);

    let solution = Solver::new().solve(&problem);
    let named: Vec<(&str, f64)> = solution.named_values(&problem).collect();

    assert_eq!(named.len(), 2);
    assert_eq!(named[0].0, "a");
    assert_eq!(named[1], ("b", 5.0));
}
