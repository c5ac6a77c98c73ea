use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use porosity_wave::{Simulation, SimulationConfig};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Elastic-diffusive porosity wave simulator
#[derive(Parser)]
#[command(name = "porosity-wave")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Elastic-diffusive porosity wave simulator", long_about = None)]
struct Cli {
    /// Parameter file (JSON, or TOML with a .toml extension)
    parameter_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", value_parser = Level::from_str)]
    log_level: Level,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    if !cli.parameter_file.exists() {
        eprintln!("Error: Parameter file '{}' not found.", cli.parameter_file.display());
        eprintln!("{}", Cli::command().render_usage());
        return ExitCode::from(1);
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: cannot install logger: {}", e);
        return ExitCode::from(1);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let path = &cli.parameter_file;
    let config = SimulationConfig::from_file(path)
        .with_context(|| format!("failed to load parameters from '{}'", path.display()))?;

    let mut sim = Simulation::new(config).context("failed to set up the simulation")?;

    let bar = ProgressBar::new(sim.remaining_steps() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} steps [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let summary = sim
        .run(|step, time| {
            if step > 0 {
                bar.inc(1);
                bar.set_message(format!("t = {:.4e}", time));
            }
        })
        .context("simulation failed")?;
    bar.finish();

    info!(
        "Wrote {} checkpoints to {}",
        summary.times.len(),
        summary.output_dir.display()
    );
    Ok(())
}
