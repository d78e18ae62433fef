use clap::{Parser, Subcommand, ValueEnum};
use mipkit_models::{
    CriteriaConfig, DecisionReport, MixedOutcome, NetworkParams, NetworkReport, PayoffMatrix, Recommendation,
    evaluate, solve_network,
};
use mipkit_solver::Solver;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mipkit")]
#[command(about = "Distribution network optimizer and decision-criteria engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Solver backend (microlp, highs)
    #[arg(short, long, global = true, default_value = "microlp")]
    backend: String,
    /// Wall-clock budget per solve, in seconds
    #[arg(short, long, global = true)]
    time_limit: Option<f64>,
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Pretty)]
    format: Format,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the reference distribution network
    Network,
    /// Evaluate the decision criteria on the reference payoff matrix
    Criteria,
    /// Run both problems
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut solver = match Solver::create(&cli.backend) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(secs) = cli.time_limit {
        match Duration::try_from_secs_f64(secs) {
            Ok(limit) => solver = solver.with_time_limit(limit),
            Err(_) => {
                eprintln!("Error: invalid time limit {}", secs);
                std::process::exit(1);
            }
        }
    }
    debug!(backend = %solver.backend(), time_limit = ?solver.time_limit(), "solver configured");

    // Each problem reports on its own; a failure in one does not stop the other
    let ok = match cli.command {
        Commands::Network => run_network(&solver, cli.format),
        Commands::Criteria => run_criteria(&solver, cli.format),
        Commands::All => {
            let network = run_network(&solver, cli.format);
            println!();
            let criteria = run_criteria(&solver, cli.format);
            network && criteria
        }
    };

    if !ok {
        std::process::exit(1);
    }
}

fn run_network(solver: &Solver, format: Format) -> bool {
    match solve_network(&NetworkParams::default(), solver) {
        Ok(report) => match format {
            Format::Json => print_json(&report),
            Format::Pretty => {
                print_network(&report);
                true
            }
        },
        Err(e) => {
            eprintln!("Network: {}", e);
            false
        }
    }
}

fn run_criteria(solver: &Solver, format: Format) -> bool {
    match evaluate(&PayoffMatrix::reference(), &CriteriaConfig::default(), solver) {
        Ok(report) => match format {
            Format::Json => print_json(&report),
            Format::Pretty => {
                print_decision(&report);
                true
            }
        },
        Err(e) => {
            eprintln!("Criteria: {}", e);
            false
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{}", s);
            true
        }
        Err(e) => {
            eprintln!("Error serializing report: {}", e);
            false
        }
    }
}

fn variable_lines(variables: &[(String, f64)]) -> Vec<String> {
    variables
        .iter()
        .map(|(name, value)| format!("  {:>20} = {}", name, value))
        .collect()
}

fn print_network(report: &NetworkReport) {
    println!("Status: OPTIMAL");
    println!("Profit: {:.2}", report.objective_value);
    println!("Revenue: {:.2}", report.revenue);
    println!();

    println!("Supply:");
    println!("  {:20} {:12.2}", "source 1", report.source1);
    println!("  {:20} {:12.2}", "source 2", report.source2);
    println!();

    println!("Transport:");
    println!("  {:20} {:12.0}", "carts", report.carts);
    println!("  {:20} {:12.0}", "locomotives", report.locomotives);
    println!("  {:20} {:12.0}", "trucks", report.trucks);
    println!();

    println!("Processing:");
    println!("  {:20} {:12.2}", "processed", report.processed);
    println!("  {:20} {:12.0}", "crews", report.crews);
    println!("  {:20} {:12.0}", "workers", report.workers);
    let state = if report.unit_active { "on" } else { "off" };
    println!("  {:20} {:12.2} ({})", "production unit", report.unit_throughput, state);
    println!();

    println!("Products:");
    println!("  {:20} {:12.2}", "product 1", report.product1);
    println!("  {:20} {:12.2}", "product 2", report.product2);
    println!();

    let c = &report.costs;
    println!("Costs:");
    for (name, value) in [
        ("source 1 shipping", c.source1_shipping),
        ("source 2 shipping", c.source2_shipping),
        ("carts", c.carts),
        ("locomotives", c.locomotives),
        ("trucks", c.trucks),
        ("workforce", c.workforce),
        ("production unit", c.unit),
    ] {
        println!("  {:20} {:12.2}", name, value);
    }
    println!("  {:20} {:12.2}", "total", c.total());
    println!();

    println!("Variables:");
    for line in variable_lines(&report.variables) {
        println!("{}", line);
    }
}

fn print_recommendation(rec: &Recommendation) {
    println!("{}:", rec.criterion);
    let scores: Vec<String> = rec.scores.iter().map(|s| format!("{:.2}", s)).collect();
    println!("  scores: [{}]", scores.join(", "));
    println!("  best:   {} (#{}, {:.2})", rec.label, rec.index + 1, rec.score);
}

fn print_decision(report: &DecisionReport) {
    let m = &report.matrix;
    println!("Payoff matrix:");
    for (label, row) in m.strategies().iter().zip(m.rows()) {
        let cells: Vec<String> = row.iter().map(|x| format!("{:6.1}", x)).collect();
        println!("  {:36} {}", label, cells.join(" "));
    }
    println!();

    print_recommendation(&report.laplace);
    print_recommendation(&report.wald);
    println!("Regret matrix:");
    for row in &report.savage.regret {
        let cells: Vec<String> = row.iter().map(|x| format!("{:6.1}", x)).collect();
        println!("  {}", cells.join(" "));
    }
    print_recommendation(&report.savage.recommendation);
    print_recommendation(&report.hurwicz);
    println!();

    let sim = &report.simulation;
    println!("Simulation ({} draws):", sim.draws);
    for (state, count) in m.states().iter().zip(&sim.state_counts) {
        println!("  {:20} drawn {:5}", state, count);
    }
    for (label, (total, avg)) in m.strategies().iter().zip(sim.totals.iter().zip(&sim.averages)) {
        println!("  {:36} total {:10.2}  average {:8.2}", label, total, avg);
    }
    println!();

    let sp = &report.saddle_point;
    println!("Saddle point:");
    println!("  maximin {:.2} (strategy #{})", sp.maximin, sp.maximin_index + 1);
    println!("  minimax {:.2} (state #{})", sp.minimax, sp.minimax_index + 1);
    if sp.found {
        println!("  saddle point found, pure strategy #{} is optimal", sp.maximin_index + 1);
    } else {
        println!("  no saddle point");
    }
    println!();

    match &report.mixed_strategy {
        MixedOutcome::Solved(mix) => {
            println!("Mixed strategy ({:?}):", mix.formulation);
            for (label, p) in m.strategies().iter().zip(&mix.probabilities) {
                println!("  {:36} {:.4}", label, p);
            }
            println!("  value {:.4}", mix.value);
        }
        MixedOutcome::Failed { reason } => {
            println!("Mixed strategy: not available ({})", reason);
        }
    }
}
