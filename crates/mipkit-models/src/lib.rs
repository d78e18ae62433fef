pub mod banded;
pub mod ceiling;
pub mod config;
pub mod criteria;
pub mod error;
pub mod mixed;
pub mod network;
pub mod simulation;
pub mod tiered;

pub use banded::{Band, BandedVars, add_banded_throughput};
pub use ceiling::add_ceiling_proxy;
pub use config::CriteriaConfig;
pub use criteria::{
    Criterion, DecisionReport, MixedOutcome, PayoffMatrix, Recommendation, SaddlePoint, SavageReport, evaluate,
    hurwicz, laplace, saddle_point, savage, wald,
};
pub use error::ModelError;
pub use mixed::{MixedFormulation, MixedStrategy, mixed_strategy};
pub use network::{
    CostBreakdown, NetworkModel, NetworkParams, NetworkReport, ProcessingParams, ProductParams, RailParams, SourceParams,
    TruckParams, UnitParams, solve_network,
};
pub use simulation::{SimulationReport, StateDistribution, simulate, simulate_seeded};
pub use tiered::{Tier, TierFill, TieredCost, TieredCostVars};
