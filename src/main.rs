use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use forcefit::core::space::ParameterSpace;
use forcefit::engine::evaluator::SumLoss;
use forcefit::solvers::driver::{DriverConfig, OptimizationDriver};

// --- CLI Definitions ---

#[derive(Parser, Debug)]
#[command(author, version, about = "forcefit: force-field calibration demo run", long_about = None)]
struct Args {
    /// Number of quasi-random exploration trials
    #[arg(long, default_value_t = 5)]
    sobol_trials: usize,

    /// Number of surrogate-guided exploitation trials
    #[arg(long, default_value_t = 15)]
    botorch_trials: usize,

    /// Seed for the exploration sequence
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Optional CSV export path for the trial ledger
    #[arg(long)]
    export_csv: Option<PathBuf>,
}

fn run(args: &Args) -> Result<()> {
    // Demo search space with the placeholder sum objective.
    let space = ParameterSpace::new()
        .add_range("x1", 0.0, 1.0)
        .add_range("x2", 5.0, 11.0)
        .add_range("x3", 0.0, 10.0);

    let config = DriverConfig {
        num_sobol_trials: args.sobol_trials,
        num_botorch_trials: args.botorch_trials,
        seed: args.seed,
        ..Default::default()
    };

    let driver = OptimizationDriver::new(space, config).context("Failed to set up the run")?;
    let ledger = driver.run(&SumLoss).context("Calibration run failed")?;

    if let Some(path) = &args.export_csv {
        ledger
            .write_csv(path)
            .with_context(|| format!("Failed to write ledger to {}", path.display()))?;
    }

    let (best_trial, best_loss) = ledger.best().context("No completed trials")?;
    println!("Best loss: {best_loss}");
    for (name, value) in best_trial.candidate.to_map(driver.space()) {
        println!("  {name} = {value}");
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{e:#}");
        process::exit(1);
    }
}
