//! `societies` command-line entrypoint
//!
//! Runs a simulation from a JSON config and prints one summary line per
//! day to stdout, as JSON lines with `--json`. Logs go to stderr, filtered
//! by `RUST_LOG` or `--log-level`.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use societies_core::{DaySummary, Simulation, SimulationConfig};

/// Agent-based simulation of an emerging economy.
#[derive(Parser, Debug)]
#[command(name = "societies")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, env = "SOCIETIES_LOG", default_value = "societies_core=info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a simulation and print one summary per day.
    Run(RunArgs),

    /// Check a config file without running it.
    Validate {
        /// Path to the JSON config.
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the default configuration as JSON.
    Defaults,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the JSON config; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of simulated days.
    #[arg(long)]
    days: Option<usize>,

    /// Emit summaries (and events) as JSON lines.
    #[arg(long)]
    json: bool,

    /// Print the recorded event log after the summaries.
    #[arg(long)]
    events: bool,

    /// Only print events involving this agent.
    #[arg(long, requires = "events")]
    agent: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_simulation(args),
        Commands::Validate { config } => {
            let loaded = load_config(&config)?;
            println!(
                "{}: ok ({} agents, {} resources, {} days)",
                config.display(),
                loaded.num_agents,
                loaded.num_resources,
                loaded.num_days
            );
            Ok(())
        }
        Commands::Defaults => {
            let json = serde_json::to_string_pretty(&SimulationConfig::default())
                .context("failed to serialize default config")?;
            println!("{json}");
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    SimulationConfig::from_file(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn run_simulation(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(days) = args.days {
        config.num_days = days;
    }
    if args.events {
        config.record_events = true;
    }

    let mut sim = Simulation::new(config).context("failed to build simulation")?;
    info!(run_id = %sim.run_id(), "starting run");

    let mut out = BufWriter::new(io::stdout().lock());
    while !sim.is_finished() {
        let summary = sim.run_day();
        if args.json {
            serde_json::to_writer(&mut out, &summary).context("failed to write day summary")?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", summary_line(&summary))?;
        }
    }

    if args.events {
        let events = match args.agent {
            Some(agent) => sim.events().events_for_agent(agent),
            None => sim.events().events().iter().collect(),
        };
        for event in events {
            if args.json {
                serde_json::to_writer(&mut out, event).context("failed to write event")?;
                writeln!(out)?;
            } else {
                writeln!(out, "{event:?}")?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn summary_line(summary: &DaySummary) -> String {
    format!(
        "day {:>4}  agents {:>3}  utility {:>12.2}  gathered {:>6}  traded {:>5}/{:<5}  devices made {:>4} traded {:>4}  inventions {}",
        summary.day,
        summary.active_agents,
        summary.total_utility,
        summary.units_gathered,
        summary.units_traded_for_resources,
        summary.units_traded_for_devices,
        summary.total_devices_made(),
        summary.total_devices_traded(),
        summary.inventions,
    )
}
