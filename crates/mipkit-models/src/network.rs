use mipkit_solver::{ConstraintOp, LinearExpr, MipProblem, Solver, VarId};
use tracing::{info, warn};

use crate::banded::{Band, add_banded_throughput};
use crate::ceiling::add_ceiling_proxy;
use crate::error::ModelError;
use crate::tiered::{TierFill, TieredCost};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SourceParams {
    /// Maximum quantity available
    pub capacity: f64,
    /// Cumulative upper boundary of each shipping tier
    pub tier_uppers: Vec<f64>,
    /// Per-unit shipping rate of each tier
    pub tier_rates: Vec<f64>,
    pub fill: TierFill,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RailParams {
    pub cart_capacity: f64,
    pub cart_cost: f64,
    pub carts_per_locomotive: f64,
    pub locomotive_cost: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruckParams {
    pub truck_capacity: f64,
    pub truck_cost: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingParams {
    /// Total throughput limit of the processing stage
    pub capacity: f64,
    /// Share of source 1 that ends up in the direct stream
    pub source1_direct_share: f64,
    /// Share of processed source 2 that ends up in the direct stream
    pub source2_direct_share: f64,
    /// Workers required per started block of `crew_load`
    pub crew_size: f64,
    pub crew_load: f64,
    pub worker_cost: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitParams {
    pub low: f64,
    pub high: f64,
    pub cost_per_tonne: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductParams {
    pub price: f64,
    pub min_delivery: f64,
}

/// All constants of the network. `Default` is the reference scenario.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkParams {
    pub source1: SourceParams,
    pub source2: SourceParams,
    pub rail: RailParams,
    pub truck: TruckParams,
    pub processing: ProcessingParams,
    pub unit: UnitParams,
    pub product1: ProductParams,
    pub product2: ProductParams,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            source1: SourceParams {
                capacity: 12_000.0,
                tier_uppers: vec![3620.0, 8055.0, 12_000.0],
                tier_rates: vec![8.0, 9.0, 12.0],
                fill: TierFill::Free,
            },
            source2: SourceParams {
                capacity: 9000.0,
                tier_uppers: vec![2396.0, 5924.0, 9000.0],
                tier_rates: vec![14.0, 10.0, 7.0],
                fill: TierFill::Ordered,
            },
            rail: RailParams {
                cart_capacity: 15.0,
                cart_cost: 1290.0,
                carts_per_locomotive: 10.0,
                locomotive_cost: 4470.0,
            },
            truck: TruckParams {
                truck_capacity: 25.0,
                truck_cost: 1500.0,
            },
            processing: ProcessingParams {
                capacity: 16_800.0,
                source1_direct_share: 0.6,
                source2_direct_share: 0.9,
                crew_size: 4.0,
                crew_load: 250.0,
                worker_cost: 200.0,
            },
            unit: UnitParams {
                low: 2250.0,
                high: 6750.0,
                cost_per_tonne: 43.0,
            },
            product1: ProductParams {
                price: 581.0,
                min_delivery: 5250.0,
            },
            product2: ProductParams {
                price: 491.0,
                min_delivery: 5250.0,
            },
        }
    }
}

impl NetworkParams {
    fn validate(&self) -> Result<(), ModelError> {
        let non_negative = [
            ("rail.cart_cost", self.rail.cart_cost),
            ("rail.locomotive_cost", self.rail.locomotive_cost),
            ("truck.truck_cost", self.truck.truck_cost),
            ("processing.worker_cost", self.processing.worker_cost),
            ("processing.crew_size", self.processing.crew_size),
            ("unit.cost_per_tonne", self.unit.cost_per_tonne),
            ("product1.price", self.product1.price),
            ("product1.min_delivery", self.product1.min_delivery),
            ("product2.price", self.product2.price),
            ("product2.min_delivery", self.product2.min_delivery),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelError::InvalidParameter {
                    name: name.to_string(),
                    value,
                });
            }
        }

        let shares = [
            ("processing.source1_direct_share", self.processing.source1_direct_share),
            ("processing.source2_direct_share", self.processing.source2_direct_share),
        ];
        for (name, value) in shares {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::InvalidParameter {
                    name: name.to_string(),
                    value,
                });
            }
        }

        let capacities = [
            ("source1.capacity", self.source1.capacity),
            ("source2.capacity", self.source2.capacity),
            ("processing.capacity", self.processing.capacity),
        ];
        for (name, value) in capacities {
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::InvalidCapacity(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Handles to the variables the report reads back
#[derive(Debug, Clone)]
struct NetworkVars {
    source1: VarId,
    source2: VarId,
    source1_cost: VarId,
    source2_cost: VarId,
    carts: VarId,
    locomotives: VarId,
    trucks: VarId,
    direct: VarId,
    secondary: VarId,
    crews: VarId,
    workers: VarId,
    unit: VarId,
    unit_active: VarId,
    product1: VarId,
    product2: VarId,
}

/// The network built as a single mixed-integer program
#[derive(Debug, Clone)]
pub struct NetworkModel {
    params: NetworkParams,
    problem: MipProblem,
    vars: NetworkVars,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CostBreakdown {
    pub source1_shipping: f64,
    pub source2_shipping: f64,
    pub carts: f64,
    pub locomotives: f64,
    pub trucks: f64,
    pub workforce: f64,
    pub unit: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.source1_shipping
            + self.source2_shipping
            + self.carts
            + self.locomotives
            + self.trucks
            + self.workforce
            + self.unit
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct NetworkReport {
    /// Revenue minus all costs at the optimum
    pub objective_value: f64,
    pub revenue: f64,
    pub costs: CostBreakdown,
    pub source1: f64,
    pub source2: f64,
    pub carts: f64,
    pub locomotives: f64,
    pub trucks: f64,
    pub processed: f64,
    pub crews: f64,
    pub workers: f64,
    pub unit_throughput: f64,
    pub unit_active: bool,
    pub product1: f64,
    pub product2: f64,
    /// Every variable of the model with its solved value
    pub variables: Vec<(String, f64)>,
}

impl NetworkModel {
    pub fn build(params: &NetworkParams) -> Result<Self, ModelError> {
        params.validate()?;

        let source1_tiers = TieredCost::new(&params.source1.tier_uppers, &params.source1.tier_rates)?;
        let source2_tiers = TieredCost::new(&params.source2.tier_uppers, &params.source2.tier_rates)?;
        for (name, source, tiers) in [
            ("source1.capacity", &params.source1, &source1_tiers),
            ("source2.capacity", &params.source2, &source2_tiers),
        ] {
            if source.capacity > tiers.capacity() {
                return Err(ModelError::InvalidParameter {
                    name: name.to_string(),
                    value: source.capacity,
                });
            }
        }
        let unit_band = Band::new(params.unit.low, params.unit.high)?;

        let mut problem = MipProblem::new();

        // Supply and tiered shipping
        let source1 = problem.continuous("source1", 0.0, params.source1.capacity);
        let source2 = problem.continuous("source2", 0.0, params.source2.capacity);
        let source1_cost = source1_tiers.encode(&mut problem, "source1", source1, params.source1.fill)?.cost;
        let source2_cost = source2_tiers.encode(&mut problem, "source2", source2, params.source2.fill)?.cost;

        // Transport sizing
        let carts = add_ceiling_proxy(&mut problem, "carts", source1, params.rail.cart_capacity)?;
        let locomotives = add_ceiling_proxy(&mut problem, "locomotives", carts, params.rail.carts_per_locomotive)?;
        let trucks = add_ceiling_proxy(&mut problem, "trucks", source2, params.truck.truck_capacity)?;

        // Source 2 is shared between processing and the production unit
        let source2_processed = problem.continuous("source2_processed", 0.0, f64::INFINITY);
        let unit = add_banded_throughput(&mut problem, "unit", unit_band);
        problem.add_constraint(
            "source2_split",
            source2_processed + unit.throughput,
            ConstraintOp::Eq,
            source2,
        );

        // Processing streams
        let p = &params.processing;
        let direct = problem.continuous("direct", 0.0, f64::INFINITY);
        let secondary = problem.continuous("secondary", 0.0, f64::INFINITY);
        problem.add_constraint(
            "direct_stream",
            direct,
            ConstraintOp::Eq,
            source1 * p.source1_direct_share + source2_processed * p.source2_direct_share,
        );
        problem.add_constraint(
            "secondary_stream",
            secondary,
            ConstraintOp::Eq,
            source1 * (1.0 - p.source1_direct_share) + source2_processed * (1.0 - p.source2_direct_share),
        );
        problem.add_constraint("processing_capacity", direct + secondary, ConstraintOp::Le, p.capacity);

        // Workforce: crew_size workers per started crew_load
        let crews = add_ceiling_proxy(&mut problem, "crews", direct + secondary, p.crew_load)?;
        let workers = problem.integer("workers", 0.0, f64::INFINITY);
        problem.add_constraint("crew_staffing", workers, ConstraintOp::Eq, crews * p.crew_size);

        // Products
        let product1 = problem.continuous("product1", 0.0, f64::INFINITY);
        let product2 = problem.continuous("product2", 0.0, f64::INFINITY);
        problem.add_constraint("product1_output", product1, ConstraintOp::Eq, direct);
        problem.add_constraint("product2_output", product2, ConstraintOp::Eq, secondary + unit.throughput);
        problem.add_constraint(
            "product1_min_delivery",
            product1,
            ConstraintOp::Ge,
            params.product1.min_delivery,
        );
        problem.add_constraint(
            "product2_min_delivery",
            product2,
            ConstraintOp::Ge,
            params.product2.min_delivery,
        );

        let revenue = product1 * params.product1.price + product2 * params.product2.price;
        let costs = LinearExpr::sum([source1_cost, source2_cost])
            + carts * params.rail.cart_cost
            + locomotives * params.rail.locomotive_cost
            + trucks * params.truck.truck_cost
            + workers * p.worker_cost
            + unit.throughput * params.unit.cost_per_tonne;
        problem.maximize(revenue - costs);

        Ok(Self {
            params: params.clone(),
            problem,
            vars: NetworkVars {
                source1,
                source2,
                source1_cost,
                source2_cost,
                carts,
                locomotives,
                trucks,
                direct,
                secondary,
                crews,
                workers,
                unit: unit.throughput,
                unit_active: unit.active,
                product1,
                product2,
            },
        })
    }

    pub fn problem(&self) -> &MipProblem {
        &self.problem
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    pub fn solve(&self, solver: &Solver) -> Result<NetworkReport, ModelError> {
        let solution = solver.solve(&self.problem);
        if !solution.is_optimal() {
            warn!(status = %solution.status, "network model has no optimal solution");
            return Err(ModelError::NotOptimal {
                status: solution.status,
            });
        }

        let v = &self.vars;
        let params = &self.params;
        let value = |var: VarId| solution.value(var);

        let costs = CostBreakdown {
            source1_shipping: value(v.source1_cost),
            source2_shipping: value(v.source2_cost),
            carts: value(v.carts) * params.rail.cart_cost,
            locomotives: value(v.locomotives) * params.rail.locomotive_cost,
            trucks: value(v.trucks) * params.truck.truck_cost,
            workforce: value(v.workers) * params.processing.worker_cost,
            unit: value(v.unit) * params.unit.cost_per_tonne,
        };
        let revenue = value(v.product1) * params.product1.price + value(v.product2) * params.product2.price;

        info!(objective = solution.objective_value, revenue, costs = costs.total(), "network solved");

        Ok(NetworkReport {
            objective_value: solution.objective_value,
            revenue,
            costs,
            source1: value(v.source1),
            source2: value(v.source2),
            carts: value(v.carts),
            locomotives: value(v.locomotives),
            trucks: value(v.trucks),
            processed: value(v.direct) + value(v.secondary),
            crews: value(v.crews),
            workers: value(v.workers),
            unit_throughput: value(v.unit),
            unit_active: value(v.unit_active) > 0.5,
            product1: value(v.product1),
            product2: value(v.product2),
            variables: solution
                .named_values(&self.problem)
                .map(|(name, x)| (name.to_string(), x))
                .collect(),
        })
    }
}

/// Build the network for `params` and solve it once
pub fn solve_network(params: &NetworkParams, solver: &Solver) -> Result<NetworkReport, ModelError> {
    NetworkModel::build(params)?.solve(solver)
}
