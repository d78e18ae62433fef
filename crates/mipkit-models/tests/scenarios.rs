use mipkit_models::{Band, CriteriaConfig, MixedOutcome, NetworkModel, NetworkParams, PayoffMatrix, TieredCost, evaluate};
use mipkit_solver::Solver;

const TOL: f64 = 0.05;

/// Smallest count of `capacity`-sized units holding `load`
fn ceil_count(load: f64, capacity: f64) -> f64 {
    ((load - TOL) / capacity).ceil().max(0.0)
}

#[test]
fn reference_network_solves_to_a_consistent_plan() {
    let params = NetworkParams::default();
    let model = NetworkModel::build(&params).unwrap();
    let report = model.solve(&Solver::new()).unwrap();

    // every bound, integrality and linear constraint holds
    let values: Vec<f64> = report.variables.iter().map(|(_, x)| *x).collect();
    let violations = model.problem().violations(&values, TOL);
    assert!(violations.is_empty(), "{violations:#?}");

    assert!(report.product1 >= params.product1.min_delivery - TOL);
    assert!(report.product2 >= params.product2.min_delivery - TOL);
    assert!(report.processed <= params.processing.capacity + TOL);
    assert!(report.source1 <= params.source1.capacity + TOL);
    assert!(report.source2 <= params.source2.capacity + TOL);

    // costly counts sit exactly at their ceilings
    assert_eq!(report.carts, ceil_count(report.source1, params.rail.cart_capacity));
    assert_eq!(
        report.locomotives,
        ceil_count(report.carts, params.rail.carts_per_locomotive)
    );
    assert_eq!(report.trucks, ceil_count(report.source2, params.truck.truck_capacity));
    assert_eq!(report.crews, ceil_count(report.processed, params.processing.crew_load));
    assert_eq!(report.workers, report.crews * params.processing.crew_size);

    let band = Band::new(params.unit.low, params.unit.high).unwrap();
    if report.unit_active {
        assert!(band.admits(report.unit_throughput, TOL));
    } else {
        assert!(report.unit_throughput.abs() < TOL);
    }

    // modelled shipping cost agrees with the schedule
    let s1 = TieredCost::new(&params.source1.tier_uppers, &params.source1.tier_rates).unwrap();
    let s2 = TieredCost::new(&params.source2.tier_uppers, &params.source2.tier_rates).unwrap();
    assert!((report.costs.source1_shipping - s1.cost_at(report.source1)).abs() < 1.0);
    assert!((report.costs.source2_shipping - s2.cost_at(report.source2)).abs() < 1.0);

    let profit = report.revenue - report.costs.total();
    assert!(
        (report.objective_value - profit).abs() < 1.0,
        "objective {} vs profit {profit}",
        report.objective_value
    );
    assert!(report.objective_value > 0.0);
}

#[test]
fn disabling_the_unit_band_still_meets_deliveries() {
    // a band far above what source 2 can supply keeps the unit off
    let mut params = NetworkParams::default();
    params.unit.low = 9500.0;
    params.unit.high = 10_000.0;

    let report = mipkit_models::solve_network(&params, &Solver::new()).unwrap();

    assert!(!report.unit_active);
    assert!(report.unit_throughput.abs() < TOL);
    assert!(report.product1 >= params.product1.min_delivery - TOL);
    assert!(report.product2 >= params.product2.min_delivery - TOL);
}

#[test]
fn report_lists_every_model_variable() {
    let model = NetworkModel::build(&NetworkParams::default()).unwrap();
    let report = model.solve(&Solver::new()).unwrap();

    assert_eq!(report.variables.len(), model.problem().num_variables());
    assert!(report.variables.iter().any(|(name, _)| name == "locomotives"));
}
#[test]
fn reference_matrix_full_evaluation() {
    let matrix = PayoffMatrix::reference();
    let report = evaluate(&matrix, &CriteriaConfig::default(), &Solver::new()).unwrap();

    assert_eq!(report.laplace.index, 0);
    assert_eq!(report.wald.index, 3);
    assert_eq!(report.savage.recommendation.index, 1);
    assert_eq!(report.hurwicz.index, 3);
    assert!(!report.saddle_point.found);

    assert_eq!(report.simulation.draws, 100);
    assert_eq!(report.simulation.state_counts.iter().sum::<usize>(), 100);

    match &report.mixed_strategy {
        MixedOutcome::Solved(mix) => {
            let sum: f64 = mix.probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
            assert!(mix.value >= report.saddle_point.maximin - 1e-6);
            assert!(mix.value <= report.saddle_point.minimax + 1e-6);
        }
        MixedOutcome::Failed { reason } => panic!("mixed strategy failed: {reason}"),
    }
}

#[test]
fn same_seed_same_report() {
    let matrix = PayoffMatrix::reference();
    let config = CriteriaConfig {
        draws: 500,
        seed: 42,
        ..CriteriaConfig::default()
    };
    let a = evaluate(&matrix, &config, &Solver::new()).unwrap();
    let b = evaluate(&matrix, &config, &Solver::new()).unwrap();
    assert_eq!(a.simulation, b.simulation);
}

#[test]
fn custom_matrix_with_mismatched_weights_is_rejected() {
    let matrix = PayoffMatrix::unlabeled(vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]]).unwrap();
    assert!(evaluate(&matrix, &CriteriaConfig::default(), &Solver::new()).is_err());

    let config = CriteriaConfig {
        weights: vec![1, 1, 1],
        ..CriteriaConfig::default()
    };
    let report = evaluate(&matrix, &config, &Solver::new()).unwrap();
    assert_eq!(report.laplace.scores, vec![2.0, 2.0]);
    assert_eq!(report.laplace.index, 0);
}
