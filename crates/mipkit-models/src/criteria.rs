use mipkit_solver::Solver;
use tracing::{debug, warn};

use crate::config::CriteriaConfig;
use crate::error::ModelError;
use crate::mixed::{MixedStrategy, mixed_strategy};
use crate::simulation::{SimulationReport, StateDistribution, simulate_seeded};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PayoffMatrix {
    strategies: Vec<String>,
    states: Vec<String>,
    payoffs: Vec<Vec<f64>>,
}

impl PayoffMatrix {
    pub fn new(strategies: Vec<String>, states: Vec<String>, payoffs: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        if payoffs.is_empty() || payoffs[0].is_empty() {
            return Err(ModelError::InvalidMatrix("matrix is empty".to_string()));
        }
        let width = payoffs[0].len();
        if let Some(i) = payoffs.iter().position(|row| row.len() != width) {
            return Err(ModelError::InvalidMatrix(format!(
                "row {i} has {} entries, expected {width}",
                payoffs[i].len()
            )));
        }
        if payoffs.iter().flatten().any(|x| !x.is_finite()) {
            return Err(ModelError::InvalidMatrix("payoffs must be finite".to_string()));
        }
        if strategies.len() != payoffs.len() {
            return Err(ModelError::InvalidMatrix(format!(
                "{} strategy labels for {} rows",
                strategies.len(),
                payoffs.len()
            )));
        }
        if states.len() != width {
            return Err(ModelError::InvalidMatrix(format!(
                "{} state labels for {width} columns",
                states.len()
            )));
        }
        Ok(Self {
            strategies,
            states,
            payoffs,
        })
    }

    /// Matrix with generated labels `S1..Sn` and `E1..Em`
    pub fn unlabeled(payoffs: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let rows = payoffs.len();
        let cols = payoffs.first().map_or(0, Vec::len);
        Self::new(
            (1..=rows).map(|i| format!("S{i}")).collect(),
            (1..=cols).map(|j| format!("E{j}")).collect(),
            payoffs,
        )
    }

    /// Production plans against the state of the economy
    pub fn reference() -> Self {
        let labels = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            strategies: labels(&[
                "Keep production level",
                "Slightly increase production",
                "Significantly increase production",
                "Change production profile",
            ]),
            states: labels(&["Strong growth", "Moderate growth", "Moderate recession", "Strong recession"]),
            payoffs: vec![
                vec![33.0, 22.0, 21.0, 4.0],
                vec![42.0, 25.0, 5.0, 2.0],
                vec![63.0, 16.0, 3.0, -22.0],
                vec![6.0, 8.0, 22.0, 22.0],
            ],
        }
    }

    pub fn strategies(&self) -> &[String] {
        &self.strategies
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.payoffs
    }

    pub fn num_strategies(&self) -> usize {
        self.payoffs.len()
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Payoff of `strategy` in `state`, `None` when either index is out of range
    pub fn get(&self, strategy: usize, state: usize) -> Option<f64> {
        self.payoffs.get(strategy)?.get(state).copied()
    }

    pub(crate) fn payoff(&self, strategy: usize, state: usize) -> f64 {
        self.payoffs[strategy][state]
    }

    pub fn row_means(&self) -> Vec<f64> {
        self.payoffs
            .iter()
            .map(|row| row.iter().sum::<f64>() / row.len() as f64)
            .collect()
    }

    pub fn row_minima(&self) -> Vec<f64> {
        self.payoffs
            .iter()
            .map(|row| row.iter().copied().fold(f64::INFINITY, f64::min))
            .collect()
    }

    pub fn row_maxima(&self) -> Vec<f64> {
        self.payoffs
            .iter()
            .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .collect()
    }

    pub fn column_maxima(&self) -> Vec<f64> {
        (0..self.num_states())
            .map(|j| {
                self.payoffs
                    .iter()
                    .map(|row| row[j])
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect()
    }

    /// `column_max(j) - payoff(i, j)` for every cell
    pub fn regret_matrix(&self) -> Vec<Vec<f64>> {
        let best = self.column_maxima();
        self.payoffs
            .iter()
            .map(|row| row.iter().zip(&best).map(|(x, b)| b - x).collect())
            .collect()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criterion {
    Laplace,
    Wald,
    Savage,
    Hurwicz { alpha: f64 },
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criterion::Laplace => f.write_str("Laplace"),
            Criterion::Wald => f.write_str("Wald"),
            Criterion::Savage => f.write_str("Savage"),
            Criterion::Hurwicz { alpha } => write!(f, "Hurwicz (alpha = {alpha})"),
        }
    }
}

/// Strategy chosen by a criterion, with the per-strategy scores behind it
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub criterion: Criterion,
    pub index: usize,
    pub label: String,
    /// Score of the chosen strategy
    pub score: f64,
    pub scores: Vec<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SavageReport {
    pub regret: Vec<Vec<f64>>,
    pub recommendation: Recommendation,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SaddlePoint {
    pub row_minima: Vec<f64>,
    pub column_maxima: Vec<f64>,
    /// Best worst case over strategies
    pub maximin: f64,
    pub maximin_index: usize,
    /// Smallest column maximum over states
    pub minimax: f64,
    pub minimax_index: usize,
    pub found: bool,
}

fn first_max(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

fn first_min(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s < scores[best] {
            best = i;
        }
    }
    best
}

fn recommend(matrix: &PayoffMatrix, criterion: Criterion, scores: Vec<f64>, index: usize) -> Recommendation {
    debug!(%criterion, ?scores, index, "criterion evaluated");
    Recommendation {
        criterion,
        index,
        label: matrix.strategies[index].clone(),
        score: scores[index],
        scores,
    }
}

/// Equal likelihood: highest row average
pub fn laplace(matrix: &PayoffMatrix) -> Recommendation {
    let scores = matrix.row_means();
    let index = first_max(&scores);
    recommend(matrix, Criterion::Laplace, scores, index)
}

/// Pessimist: highest row minimum
pub fn wald(matrix: &PayoffMatrix) -> Recommendation {
    let scores = matrix.row_minima();
    let index = first_max(&scores);
    recommend(matrix, Criterion::Wald, scores, index)
}

/// Minimax regret: smallest row maximum of the regret matrix
pub fn savage(matrix: &PayoffMatrix) -> SavageReport {
    let regret = matrix.regret_matrix();
    let scores: Vec<f64> = regret
        .iter()
        .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        .collect();
    let index = first_min(&scores);
    SavageReport {
        regret,
        recommendation: recommend(matrix, Criterion::Savage, scores, index),
    }
}

/// Blend of best and worst case: `(1 - alpha) * row_max + alpha * row_min`
pub fn hurwicz(matrix: &PayoffMatrix, alpha: f64) -> Result<Recommendation, ModelError> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(ModelError::InvalidOptimism(alpha));
    }
    let scores: Vec<f64> = matrix
        .row_maxima()
        .iter()
        .zip(matrix.row_minima())
        .map(|(max, min)| (1.0 - alpha) * max + alpha * min)
        .collect();
    let index = first_max(&scores);
    Ok(recommend(matrix, Criterion::Hurwicz { alpha }, scores, index))
}

/// Pure-strategy equilibrium check: `max(row_min) == min(column_max)`
pub fn saddle_point(matrix: &PayoffMatrix) -> SaddlePoint {
    let row_minima = matrix.row_minima();
    let column_maxima = matrix.column_maxima();
    let maximin_index = first_max(&row_minima);
    let minimax_index = first_min(&column_maxima);
    let maximin = row_minima[maximin_index];
    let minimax = column_maxima[minimax_index];

    SaddlePoint {
        found: maximin == minimax,
        row_minima,
        column_maxima,
        maximin,
        maximin_index,
        minimax,
        minimax_index,
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub enum MixedOutcome {
    Solved(MixedStrategy),
    Failed { reason: String },
}

/// Every criterion evaluated against one matrix
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct DecisionReport {
    pub matrix: PayoffMatrix,
    pub laplace: Recommendation,
    pub wald: Recommendation,
    pub savage: SavageReport,
    pub hurwicz: Recommendation,
    pub simulation: SimulationReport,
    pub saddle_point: SaddlePoint,
    pub mixed_strategy: MixedOutcome,
}

/// Run all criteria. Invalid configuration is an error; a failed mixed-strategy
/// solve is recorded in the report instead.
pub fn evaluate(matrix: &PayoffMatrix, config: &CriteriaConfig, solver: &Solver) -> Result<DecisionReport, ModelError> {
    let distribution = StateDistribution::new(config.weights.clone())?;
    let hurwicz = hurwicz(matrix, config.alpha)?;
    let simulation = simulate_seeded(matrix, &distribution, config.draws, config.seed)?;

    let mixed_strategy = match mixed_strategy(matrix, config.formulation, solver) {
        Ok(strategy) => MixedOutcome::Solved(strategy),
        Err(e) => {
            warn!(error = %e, "mixed strategy unavailable");
            MixedOutcome::Failed { reason: e.to_string() }
        }
    };

    Ok(DecisionReport {
        matrix: matrix.clone(),
        laplace: laplace(matrix),
        wald: wald(matrix),
        savage: savage(matrix),
        hurwicz,
        simulation,
        saddle_point: saddle_point(matrix),
        mixed_strategy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_laplace() {
        let rec = laplace(&PayoffMatrix::reference());
        assert_eq!(rec.scores, vec![20.0, 18.5, 15.0, 14.5]);
        assert_eq!(rec.index, 0);
        assert_eq!(rec.label, "Keep production level");
        assert_eq!(rec.score, 20.0);
    }

    #[test]
    fn test_reference_wald() {
        let rec = wald(&PayoffMatrix::reference());
        assert_eq!(rec.scores, vec![4.0, 2.0, -22.0, 6.0]);
        assert_eq!(rec.index, 3);
        assert_eq!(rec.label, "Change production profile");
    }

    #[test]
    fn test_reference_savage() {
        let report = savage(&PayoffMatrix::reference());
        assert_eq!(
            report.regret,
            vec![
                vec![30.0, 3.0, 1.0, 18.0],
                vec![21.0, 0.0, 17.0, 20.0],
                vec![0.0, 9.0, 19.0, 44.0],
                vec![57.0, 17.0, 0.0, 0.0],
            ]
        );
        assert_eq!(report.recommendation.scores, vec![30.0, 21.0, 44.0, 57.0]);
        assert_eq!(report.recommendation.index, 1);
    }

    #[test]
    fn test_reference_hurwicz() {
        let rec = hurwicz(&PayoffMatrix::reference(), 0.96).unwrap();
        let expected = [5.16, 3.6, -18.6, 6.64];
        for (got, want) in rec.scores.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
        assert_eq!(rec.index, 3);
    }

    #[test]
    fn test_hurwicz_extremes_match_wald_and_maximax() {
        let m = PayoffMatrix::reference();
        assert_eq!(hurwicz(&m, 1.0).unwrap().index, wald(&m).index);
        // alpha = 0 is pure optimism: row 2 has the 63
        assert_eq!(hurwicz(&m, 0.0).unwrap().index, 2);
        assert_eq!(hurwicz(&m, 1.2), Err(ModelError::InvalidOptimism(1.2)));
        assert!(hurwicz(&m, f64::NAN).is_err());
    }

    #[test]
    fn test_ties_pick_first_index() {
        let m = PayoffMatrix::unlabeled(vec![vec![1.0, 3.0], vec![3.0, 1.0], vec![0.0, 0.0]]).unwrap();
        assert_eq!(laplace(&m).index, 0);
        assert_eq!(wald(&m).index, 0);
        assert_eq!(savage(&m).recommendation.index, 0);
        assert_eq!(laplace(&m).label, "S1");
    }

    #[test]
    fn test_criteria_are_idempotent() {
        let m = PayoffMatrix::reference();
        assert_eq!(laplace(&m), laplace(&m));
        assert_eq!(wald(&m), wald(&m));
        assert_eq!(savage(&m), savage(&m));
        assert_eq!(hurwicz(&m, 0.3), hurwicz(&m, 0.3));
        assert_eq!(saddle_point(&m), saddle_point(&m));
    }

    #[test]
    fn test_reference_has_no_saddle_point() {
        let sp = saddle_point(&PayoffMatrix::reference());
        assert_eq!(sp.row_minima, vec![4.0, 2.0, -22.0, 6.0]);
        assert_eq!(sp.column_maxima, vec![63.0, 25.0, 22.0, 22.0]);
        assert_eq!((sp.maximin, sp.maximin_index), (6.0, 3));
        assert_eq!((sp.minimax, sp.minimax_index), (22.0, 2));
        assert!(!sp.found);
    }

    #[test]
    fn test_constructed_saddle_point_is_found() {
        // entry (1, 2) = 5 is the minimum of row 1 and the maximum of column 2
        let m = PayoffMatrix::unlabeled(vec![
            vec![1.0, 9.0, 4.0],
            vec![7.0, 6.0, 5.0],
            vec![8.0, 2.0, 3.0],
        ])
        .unwrap();
        let sp = saddle_point(&m);
        assert!(sp.found);
        assert_eq!((sp.maximin_index, sp.minimax_index), (1, 2));
        assert_eq!(sp.maximin, 5.0);
    }

    #[test]
    fn test_get_is_checked() {
        let m = PayoffMatrix::reference();
        assert_eq!(m.get(2, 3), Some(-22.0));
        assert_eq!(m.get(4, 0), None);
        assert_eq!(m.get(0, 4), None);
    }

    #[test]
    fn test_matrix_validation() {
        assert!(PayoffMatrix::unlabeled(vec![]).is_err());
        assert!(PayoffMatrix::unlabeled(vec![vec![1.0, 2.0], vec![3.0]]).is_err());
        assert!(PayoffMatrix::unlabeled(vec![vec![f64::NAN]]).is_err());
        assert!(PayoffMatrix::new(vec!["a".into()], vec!["x".into()], vec![vec![1.0], vec![2.0]]).is_err());
        assert!(PayoffMatrix::new(vec!["a".into()], vec![], vec![vec![1.0]]).is_err());
    }

    #[test]
    fn test_evaluate_keeps_going_when_mixed_strategy_fails() {
        let config = CriteriaConfig {
            formulation: crate::mixed::MixedFormulation::Equalizing,
            ..CriteriaConfig::default()
        };
        let report = evaluate(&PayoffMatrix::reference(), &config, &Solver::new()).unwrap();
        assert_eq!(report.wald.index, 3);
        assert_eq!(report.simulation.draws, 100);
        assert!(matches!(report.mixed_strategy, MixedOutcome::Failed { .. }));
    }

    #[test]
    fn test_evaluate_rejects_bad_config() {
        let config = CriteriaConfig {
            alpha: -0.5,
            ..CriteriaConfig::default()
        };
        assert_eq!(
            evaluate(&PayoffMatrix::reference(), &config, &Solver::new()).unwrap_err(),
            ModelError::InvalidOptimism(-0.5)
        );
    }
}
