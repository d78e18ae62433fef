use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::criteria::PayoffMatrix;
use crate::error::ModelError;

/// Discrete distribution over states given as integer weights
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDistribution {
    weights: Vec<u32>,
    cumulative: Vec<u32>,
}

impl StateDistribution {
    pub fn new(weights: Vec<u32>) -> Result<Self, ModelError> {
        if weights.is_empty() {
            return Err(ModelError::InvalidDistribution("no states".to_string()));
        }
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total: u32 = 0;
        for &w in &weights {
            total = total
                .checked_add(w)
                .ok_or_else(|| ModelError::InvalidDistribution("weights overflow".to_string()))?;
            cumulative.push(total);
        }
        if total == 0 {
            return Err(ModelError::InvalidDistribution("weights sum to zero".to_string()));
        }
        Ok(Self { weights, cumulative })
    }

    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    pub fn total(&self) -> u32 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn probabilities(&self) -> Vec<f64> {
        let total = self.total() as f64;
        self.weights.iter().map(|&w| w as f64 / total).collect()
    }

    /// Map a uniform roll in `[0, total)` to a state through the cumulative
    /// thresholds. Rolls past the end land on the last state.
    pub fn state_for(&self, roll: u32) -> usize {
        self.cumulative
            .iter()
            .position(|&threshold| roll < threshold)
            .unwrap_or(self.weights.len() - 1)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.state_for(rng.gen_range(0..self.total()))
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub draws: usize,
    /// Accumulated payoff per strategy
    pub totals: Vec<f64>,
    /// Payoff per draw per strategy
    pub averages: Vec<f64>,
    /// How often each state was drawn
    pub state_counts: Vec<usize>,
}

/// Draw `draws` states and accumulate every strategy's payoff
pub fn simulate<R: Rng + ?Sized>(
    matrix: &PayoffMatrix,
    distribution: &StateDistribution,
    draws: usize,
    rng: &mut R,
) -> Result<SimulationReport, ModelError> {
    if distribution.len() != matrix.num_states() {
        return Err(ModelError::InvalidDistribution(format!(
            "{} weights for {} states",
            distribution.len(),
            matrix.num_states()
        )));
    }
    if draws == 0 {
        return Err(ModelError::InvalidParameter {
            name: "draws".to_string(),
            value: 0.0,
        });
    }

    let mut totals = vec![0.0; matrix.num_strategies()];
    let mut state_counts = vec![0; matrix.num_states()];
    for _ in 0..draws {
        let state = distribution.sample(rng);
        state_counts[state] += 1;
        for (i, total) in totals.iter_mut().enumerate() {
            *total += matrix.payoff(i, state);
        }
    }

    let averages = totals.iter().map(|t| t / draws as f64).collect();
    debug!(draws, ?state_counts, ?totals, "simulation finished");

    Ok(SimulationReport {
        draws,
        totals,
        averages,
        state_counts,
    })
}

/// [`simulate`] with a ChaCha8 generator seeded from `seed`
pub fn simulate_seeded(
    matrix: &PayoffMatrix,
    distribution: &StateDistribution,
    draws: usize,
    seed: u64,
) -> Result<SimulationReport, ModelError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    simulate(matrix, distribution, draws, &mut rng)
}
