use std::str::FromStr;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution as _, SolverModel, constraint, variable,
};
use tracing::{debug, info, warn};

use crate::error::SolverError;
use crate::problem::{ConstraintOp, LinearExpr, MipProblem, VarKind};
use crate::solution::{Solution, SolutionStatus};

/// LP/MIP backends a [`Solver`] can hand problems to
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Pure-Rust simplex with branch-and-bound, always compiled in
    #[default]
    MicroLp,
    /// HiGHS, requires the `highs` cargo feature
    Highs,
}

impl Backend {
    pub fn id(self) -> &'static str {
        match self {
            Backend::MicroLp => "microlp",
            Backend::Highs => "highs",
        }
    }

    pub fn is_available(self) -> bool {
        match self {
            Backend::MicroLp => true,
            Backend::Highs => cfg!(feature = "highs"),
        }
    }
}

impl FromStr for Backend {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "microlp" | "default" | "mip" => Ok(Backend::MicroLp),
            "highs" => Ok(Backend::Highs),
            _ => Err(SolverError::UnknownBackend(s.to_string())),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Hands a [`MipProblem`] to an LP/MIP backend and reads the result back
#[derive(Debug, Clone)]
pub struct Solver {
    backend: Backend,
    /// Wall-clock budget for a single solve
    time_limit: Option<Duration>,
    /// Tolerance for snapping integral variables
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            time_limit: None,
            tolerance: 1e-6,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a solver for a backend identifier such as `"microlp"` or `"highs"`
    pub fn create(backend_id: &str) -> Result<Self, SolverError> {
        let backend: Backend = backend_id.parse()?;
        if !backend.is_available() {
            return Err(SolverError::BackendUnavailable(backend.id().to_string()));
        }
        Ok(Self {
            backend,
            ..Self::default()
        })
    }

    /// Stop waiting for a result after `limit` and report `TimedOut`. The
    /// microlp search is not cancelled: it keeps running on its worker thread
    /// until it finishes and its result is dropped. HiGHS also receives the
    /// limit and stops on its own.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Solve the problem with the configured backend. Never panics: malformed
    /// problems and backend failures come back as a non-optimal status.
    pub fn solve(&self, problem: &MipProblem) -> Solution {
        if let Err(defect) = problem.validate() {
            warn!(%defect, "rejecting malformed problem");
            return Solution::failed(SolutionStatus::Error);
        }

        debug!(
            backend = %self.backend,
            variables = problem.num_variables(),
            integral = problem.num_integral(),
            constraints = problem.num_constraints(),
            "solving problem"
        );

        let started = Instant::now();
        let solution = match self.time_limit {
            None => dispatch(self.backend, problem, self.tolerance, None),
            Some(limit) => self.solve_within(problem, limit),
        };

        info!(
            status = %solution.status,
            objective = solution.objective_value,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "solve finished"
        );
        solution
    }

    /// Run the backend on a worker thread and stop waiting once the budget is spent.
    /// The worker is detached on expiry and its result dropped.
    fn solve_within(&self, problem: &MipProblem, limit: Duration) -> Solution {
        let (tx, rx) = mpsc::channel();
        let owned = problem.clone();
        let backend = self.backend;
        let tolerance = self.tolerance;

        let spawned = thread::Builder::new()
            .name("mipkit-solve".to_string())
            .spawn(move || {
                let _ = tx.send(dispatch(backend, &owned, tolerance, Some(limit)));
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not start solver thread");
            return Solution::failed(SolutionStatus::Error);
        }

        match rx.recv_timeout(limit) {
            Ok(solution) => solution,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(limit_ms = limit.as_millis() as u64, "no result within time budget");
                Solution::failed(SolutionStatus::TimedOut)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!("solver thread exited without a result");
                Solution::failed(SolutionStatus::Error)
            }
        }
    }
}

fn dispatch(backend: Backend, problem: &MipProblem, tolerance: f64, time_limit: Option<Duration>) -> Solution {
    match backend {
        Backend::MicroLp => run(problem, good_lp::microlp, tolerance, |model| model),
        #[cfg(feature = "highs")]
        Backend::Highs => run(problem, good_lp::highs, tolerance, |model| match time_limit {
            Some(limit) => {
                use good_lp::solvers::WithTimeLimit;
                model.with_time_limit(limit.as_secs_f64())
            }
            None => model,
        }),
        #[cfg(not(feature = "highs"))]
        Backend::Highs => {
            let _ = time_limit;
            warn!("highs backend requested but not compiled in");
            Solution::failed(SolutionStatus::Error)
        }
    }
}

fn run<S, F>(problem: &MipProblem, backend: S, tolerance: f64, configure: F) -> Solution
where
    S: good_lp::Solver,
    S::Model: SolverModel<Error = ResolutionError>,
    F: FnOnce(S::Model) -> S::Model,
{
    let mut vars = ProblemVariables::new();
    let handles: Vec<good_lp::Variable> = problem
        .variables
        .iter()
        .map(|v| {
            let mut def = variable().name(v.name.clone());
            if v.lower.is_finite() {
                def = def.min(v.lower);
            }
            if v.upper.is_finite() {
                def = def.max(v.upper);
            }
            if v.kind.is_integral() {
                def = def.integer();
            }
            vars.add(def)
        })
        .collect();

    let objective = to_expression(&problem.objective.expr, &handles);
    let unsolved = if problem.objective.minimize {
        vars.minimise(objective)
    } else {
        vars.maximise(objective)
    };

    let mut model = configure(unsolved.using(backend));
    for c in &problem.constraints {
        let lhs = to_expression(&c.expr, &handles);
        let rhs = Expression::from(c.rhs);
        let lp_constraint = match c.op {
            ConstraintOp::Le => constraint::leq(lhs, rhs),
            ConstraintOp::Ge => constraint::geq(lhs, rhs),
            ConstraintOp::Eq => constraint::eq(lhs, rhs),
        };
        model.add_constraint(lp_constraint);
    }

    match model.solve() {
        Ok(solved) => {
            let values: Vec<f64> = problem
                .variables
                .iter()
                .zip(&handles)
                .map(|(v, &h)| {
                    let raw = solved.value(h);
                    match v.kind {
                        VarKind::Continuous => raw,
                        _ if (raw - raw.round()).abs() <= tolerance => raw.round(),
                        _ => raw,
                    }
                })
                .collect();
            let objective_value = problem.objective.expr.eval(&values);
            Solution::optimal(values, objective_value)
        }
        Err(ResolutionError::Infeasible) => Solution::infeasible(),
        Err(ResolutionError::Unbounded) => Solution::unbounded(),
        Err(e) => {
            warn!(error = %e, "backend failed");
            Solution::failed(SolutionStatus::Error)
        }
    }
}

fn to_expression(expr: &LinearExpr, handles: &[good_lp::Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for &(var, coef) in &expr.terms {
        out += handles[var.index()] * coef;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = MipProblem::new();
        let x = problem.continuous("x", 0.0, f64::INFINITY);
        let y = problem.continuous("y", 0.0, f64::INFINITY);
        problem.maximize(x * 3.0 + y * 2.0);
        problem.add_constraint("sum", x + y, ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", x, ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", y, ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value(x) - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.value(x));
        assert!((solution.value(y) - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.value(y));
        assert!((solution.objective_value - 11.0).abs() < 1e-6, "obj = {} (expected 11)", solution.objective_value);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x, y in [0, 3]
        // Optimal: x=3, y=1, obj=9
        let mut problem = MipProblem::new();
        let x = problem.continuous("x", 0.0, 3.0);
        let y = problem.continuous("y", 0.0, 3.0);
        problem.minimize(x * 2.0 + y * 3.0);
        problem.add_constraint("sum", x + y, ConstraintOp::Ge, 4.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value(x) - 3.0).abs() < 1e-6);
        assert!((solution.value(y) - 1.0).abs() < 1e-6);
        assert!((solution.objective_value - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_integer_rounding_up() {
        // Minimize n subject to 10n >= 25 with n integer: n = 3
        let mut problem = MipProblem::new();
        let n = problem.integer("n", 0.0, f64::INFINITY);
        problem.minimize(n);
        problem.add_constraint("cover", n * 10.0, ConstraintOp::Ge, 25.0);

        let solution = Solver::new().solve(&problem);

        assert!(solution.is_optimal());
        assert_eq!(solution.value(n), 3.0);
    }

    #[test]
    fn test_objective_constant_is_kept() {
        let mut problem = MipProblem::new();
        let x = problem.continuous("x", 0.0, 2.0);
        problem.maximize(x + 10.0);

        let solution = Solver::new().solve(&problem);

        assert!(solution.is_optimal());
        assert!((solution.objective_value - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        let mut problem = MipProblem::new();
        let x = problem.continuous("x", 0.0, f64::INFINITY);
        problem.minimize(x);
        problem.add_constraint("lower", x, ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", x, ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_unbounded() {
        let mut problem = MipProblem::new();
        let x = problem.continuous("x", 0.0, f64::INFINITY);
        problem.maximize(x);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_malformed_problem_reports_error() {
        let mut problem = MipProblem::new();
        let x = problem.continuous("x", 4.0, 1.0);
        problem.minimize(x);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Error);
    }

    #[test]
    fn test_backend_lookup() {
        assert_eq!("MicroLP".parse::<Backend>(), Ok(Backend::MicroLp));
        assert_eq!(" highs ".parse::<Backend>(), Ok(Backend::Highs));
        assert_eq!(
            "SCIP".parse::<Backend>(),
            Err(SolverError::UnknownBackend("SCIP".to_string()))
        );

        assert_eq!(Solver::create("microlp").map(|s| s.backend()), Ok(Backend::MicroLp));
        if !cfg!(feature = "highs") {
            assert_eq!(
                Solver::create("highs").map(|s| s.backend()),
                Err(SolverError::BackendUnavailable("highs".to_string()))
            );
        }
    }

    #[test]
    fn test_exhausted_budget_reports_timed_out() {
        // 30-item knapsack, far more work than a zero budget allows
        let mut problem = MipProblem::new();
        let items: Vec<_> = (0..30).map(|i| problem.boolean(format!("item{i}"))).collect();
        problem.maximize(LinearExpr::weighted(
            items.iter().enumerate().map(|(i, &x)| (x, (17 + 7 * i % 23) as f64)),
        ));
        problem.add_constraint(
            "capacity",
            LinearExpr::weighted(items.iter().enumerate().map(|(i, &x)| (x, (11 + 5 * i % 19) as f64))),
            ConstraintOp::Le,
            120.0,
        );

        let solver = Solver::new().with_time_limit(Duration::ZERO);
        let solution = solver.solve(&problem);

        assert_eq!(solution.status, SolutionStatus::TimedOut);
        assert_ne!(solution.status, SolutionStatus::Infeasible);
        assert!(!solution.is_optimal());
    }

    #[test]
    fn test_generous_time_limit_still_solves() {
        let mut problem = MipProblem::new();
        let n = problem.integer("n", 0.0, 100.0);
        problem.maximize(n);
        problem.add_constraint("cap", n * 3.0, ConstraintOp::Le, 20.0);

        let solver = Solver::new().with_time_limit(Duration::from_secs(30));
        let solution = solver.solve(&problem);

        assert!(solution.is_optimal());
        assert_eq!(solution.value(n), 6.0);
    }
}
