use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use masku::ui::{make_sim, MaskuArgs};

fn run(argv: &MaskuArgs) -> Result<()> {
    let config = fs::read_to_string(&argv.config_path)
        .with_context(|| format!("failed to read config file {}", argv.config_path.display()))?;
    let mut sim = make_sim(&config, Some(argv))?;
    let summary = sim.simulate()?;

    println!(
        "{} cycles, {} instructions completed, {} dropped",
        summary.cycles, summary.completed, summary.dropped
    );
    println!(
        "{} operand bundles, {} bytes strobed, result queue busy {:.1}%",
        summary.bundles_delivered,
        summary.bytes_strobed,
        summary.queue_utilization * 100.0
    );
    println!(
        "latency min {} max {} mean {:.1}",
        summary.latency.min, summary.latency.max, summary.latency.mean
    );
    Ok(())
}

pub fn main() -> ExitCode {
    env_logger::init();

    let argv = MaskuArgs::parse();
    match run(&argv) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
