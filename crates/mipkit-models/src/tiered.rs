use mipkit_solver::{ConstraintOp, LinearExpr, MipProblem, VarId};
use tracing::debug;

use crate::error::ModelError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    /// Cumulative quantity at which this tier ends
    pub upper: f64,
    /// Cost per unit inside this tier
    pub rate: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierFill {
    /// One bounded segment per tier. Lower tiers fill first only under cost
    /// pressure, so this needs non-decreasing rates.
    Free,
    /// One indicator per tier plus big-M relaxed cost lines. Any schedule.
    Ordered,
}

/// Piecewise-linear cost over consecutive tiers covering `[0, capacity]`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TieredCost {
    tiers: Vec<Tier>,
}

/// Variables created by [`TieredCost::encode`]
#[derive(Debug, Clone)]
pub struct TieredCostVars {
    /// Total cost of the quantity
    pub cost: VarId,
    /// Per-tier quantities (free fill only)
    pub segments: Vec<VarId>,
    /// Active-tier indicators (ordered fill only)
    pub indicators: Vec<VarId>,
    /// Relaxed per-tier cost candidates (ordered fill only)
    pub candidates: Vec<VarId>,
    pub big_m: Option<f64>,
}

impl TieredCost {
    pub fn new(uppers: &[f64], rates: &[f64]) -> Result<Self, ModelError> {
        if uppers.is_empty() {
            return Err(ModelError::InvalidTiers("no tiers given".to_string()));
        }
        if uppers.len() != rates.len() {
            return Err(ModelError::InvalidTiers(format!(
                "{} tier boundaries but {} rates",
                uppers.len(),
                rates.len()
            )));
        }

        let mut previous = 0.0;
        for (k, (&upper, &rate)) in uppers.iter().zip(rates).enumerate() {
            if !upper.is_finite() || upper <= previous {
                return Err(ModelError::InvalidTiers(format!(
                    "boundary {k} ({upper}) must be finite and above {previous}"
                )));
            }
            if !rate.is_finite() || rate < 0.0 {
                return Err(ModelError::InvalidTiers(format!("rate {k} ({rate}) must be finite and non-negative")));
            }
            previous = upper;
        }

        Ok(Self {
            tiers: uppers
                .iter()
                .zip(rates)
                .map(|(&upper, &rate)| Tier { upper, rate })
                .collect(),
        })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn capacity(&self) -> f64 {
        self.tiers.last().map_or(0.0, |t| t.upper)
    }

    pub(crate) fn lower_bound(&self, k: usize) -> f64 {
        if k == 0 { 0.0 } else { self.tiers[k - 1].upper }
    }

    pub(crate) fn width(&self, k: usize) -> f64 {
        self.tiers[k].upper - self.lower_bound(k)
    }

    /// Cost of completely filling tiers `0..k`
    pub(crate) fn base_cost(&self, k: usize) -> f64 {
        (0..k).map(|j| self.tiers[j].rate * self.width(j)).sum()
    }

    /// True cost of `quantity` when tiers fill in order. Quantities outside
    /// `[0, capacity]` are clamped.
    pub fn cost_at(&self, quantity: f64) -> f64 {
        let q = quantity.clamp(0.0, self.capacity());
        let k = self
            .tiers
            .iter()
            .position(|t| q <= t.upper)
            .unwrap_or(self.tiers.len() - 1);
        self.base_cost(k) + self.tiers[k].rate * (q - self.lower_bound(k))
    }

    /// Rates never decrease, so cheaper tiers come first
    pub fn is_convex(&self) -> bool {
        self.tiers.windows(2).all(|w| w[0].rate <= w[1].rate)
    }

    /// Big-M for the ordered encoding, derived from the schedule itself.
    ///
    /// Each candidate `base_k + rate_k * (q - lower_k)` is linear in `q`, so its largest
    /// magnitude over `[0, capacity]` is at an end point. Exceeding all of them lets an
    /// inactive candidate drop below zero, under any true cost.
    pub fn big_m(&self) -> f64 {
        let capacity = self.capacity();
        let largest = (0..self.tiers.len())
            .flat_map(|k| [self.candidate_at(k, 0.0), self.candidate_at(k, capacity)])
            .map(f64::abs)
            .fold(0.0, f64::max);
        largest + 1.0
    }

    fn candidate_at(&self, k: usize, q: f64) -> f64 {
        self.base_cost(k) + self.tiers[k].rate * (q - self.lower_bound(k))
    }

    /// Link `quantity` to a new cost variable on `problem` using the chosen encoding
    pub fn encode(
        &self,
        problem: &mut MipProblem,
        name: &str,
        quantity: VarId,
        fill: TierFill,
    ) -> Result<TieredCostVars, ModelError> {
        match fill {
            TierFill::Free => self.encode_free(problem, name, quantity),
            TierFill::Ordered => Ok(self.encode_ordered(problem, name, quantity)),
        }
    }

    fn encode_free(&self, problem: &mut MipProblem, name: &str, quantity: VarId) -> Result<TieredCostVars, ModelError> {
        if !self.is_convex() {
            return Err(ModelError::FreeFillRequiresConvexTiers(name.to_string()));
        }

        let segments: Vec<VarId> = (0..self.tiers.len())
            .map(|k| problem.continuous(format!("{name}_seg{}", k + 1), 0.0, self.width(k)))
            .collect();
        let cost = problem.continuous(format!("{name}_cost"), 0.0, f64::INFINITY);

        problem.add_constraint(
            format!("{name}_segments"),
            quantity,
            ConstraintOp::Eq,
            LinearExpr::sum(segments.iter().copied()),
        );
        problem.add_constraint(
            format!("{name}_segment_cost"),
            cost,
            ConstraintOp::Eq,
            LinearExpr::weighted(segments.iter().copied().zip(self.tiers.iter().map(|t| t.rate))),
        );

        Ok(TieredCostVars {
            cost,
            segments,
            indicators: Vec::new(),
            candidates: Vec::new(),
            big_m: None,
        })
    }

    fn encode_ordered(&self, problem: &mut MipProblem, name: &str, quantity: VarId) -> TieredCostVars {
        let big_m = self.big_m();
        debug!(source = name, big_m, "ordered tier encoding");

        let indicators: Vec<VarId> = (0..self.tiers.len())
            .map(|k| problem.boolean(format!("{name}_tier{}", k + 1)))
            .collect();

        // The active tier must contain the quantity
        problem.add_constraint(
            format!("{name}_tier_upper"),
            quantity,
            ConstraintOp::Le,
            LinearExpr::weighted(indicators.iter().copied().zip(self.tiers.iter().map(|t| t.upper))),
        );
        problem.add_constraint(
            format!("{name}_tier_lower"),
            quantity,
            ConstraintOp::Ge,
            LinearExpr::weighted(indicators.iter().enumerate().map(|(k, &y)| (y, self.lower_bound(k)))),
        );
        problem.add_constraint(
            format!("{name}_one_tier"),
            LinearExpr::sum(indicators.iter().copied()),
            ConstraintOp::Eq,
            1.0,
        );

        let cost = problem.continuous(format!("{name}_cost"), 0.0, f64::INFINITY);
        let mut candidates = Vec::with_capacity(self.tiers.len());
        for (k, tier) in self.tiers.iter().enumerate() {
            let candidate = problem.continuous(format!("{name}_cand{}", k + 1), f64::NEG_INFINITY, f64::INFINITY);

            // candidate = base + rate * (q - lower) - M * (1 - y)
            let line = quantity * tier.rate + (self.base_cost(k) - tier.rate * self.lower_bound(k) - big_m)
                + indicators[k] * big_m;
            problem.add_constraint(format!("{name}_cand{}_line", k + 1), candidate, ConstraintOp::Eq, line);
            problem.add_constraint(format!("{name}_cost_covers{}", k + 1), cost, ConstraintOp::Ge, candidate);
            candidates.push(candidate);
        }

        TieredCostVars {
            cost,
            segments: Vec::new(),
            indicators,
            candidates,
            big_m: Some(big_m),
        }
    }
}
