use crate::mixed::MixedFormulation;

/// Settings of the decision-criteria run. `Default` is the reference setup.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaConfig {
    /// Hurwicz weight on the row minimum
    pub alpha: f64,
    /// State weights for the Monte-Carlo run, in column order
    pub weights: Vec<u32>,
    pub draws: usize,
    pub seed: u64,
    pub formulation: MixedFormulation,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            alpha: 0.96,
            weights: vec![15, 35, 40, 10],
            draws: 100,
            seed: 12_345,
            formulation: MixedFormulation::Minimax,
        }
    }
}
