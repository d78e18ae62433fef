use mipkit_solver::{ConstraintOp, MipProblem, VarId};

use crate::error::ModelError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn new(low: f64, high: f64) -> Result<Self, ModelError> {
        if !(low.is_finite() && high.is_finite()) || low <= 0.0 || low > high {
            return Err(ModelError::InvalidBand { low, high });
        }
        Ok(Self { low, high })
    }

    /// Whether a throughput value respects the band
    pub fn admits(&self, x: f64, tolerance: f64) -> bool {
        x.abs() <= tolerance || (x >= self.low - tolerance && x <= self.high + tolerance)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BandedVars {
    pub throughput: VarId,
    /// 1 when the unit runs
    pub active: VarId,
}

/// Add `low * active <= throughput <= high * active`
pub fn add_banded_throughput(problem: &mut MipProblem, name: &str, band: Band) -> BandedVars {
    let throughput = problem.continuous(name, 0.0, f64::INFINITY);
    let active = problem.boolean(format!("{name}_active"));

    problem.add_constraint(format!("{name}_band_low"), active * band.low, ConstraintOp::Le, throughput);
    problem.add_constraint(format!("{name}_band_high"), throughput, ConstraintOp::Le, active * band.high);

    BandedVars { throughput, active }
}
