use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rustfeeder::io::config::load_config;
use rustfeeder::io::dss::{emit, write_network, EquivalentNetwork};
use rustfeeder::io::report::save_voltage_csv;
use rustfeeder::io::snapshot::load_snapshot_json;
use rustfeeder::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Default log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collapse a backbone into an equivalent branch and write the reduced network
    Reduce {
        /// Solved network snapshot (JSON)
        #[arg(long)]
        snapshot: PathBuf,
        /// Reduction configuration (JSON)
        #[arg(long)]
        config: PathBuf,
        /// Network-description header the equivalent is appended to
        #[arg(long)]
        header: PathBuf,
        /// Output network-description file
        #[arg(long)]
        out: PathBuf,
        /// Override the configured mode (`voltage_drop` or `voltage_drop_and_losses`)
        #[arg(long)]
        mode: Option<ReductionMode>,
        /// Snapshot of the re-solved reduced network, used to verify the equivalent
        #[arg(long)]
        resolved: Option<PathBuf>,
        /// Write the bus voltage table of the snapshot to this CSV file
        #[arg(long)]
        voltages_csv: Option<PathBuf>,
    },
    /// Print the bus voltage table of a snapshot
    Voltages {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Reduce {
            snapshot,
            config,
            header,
            out,
            mode,
            resolved,
            voltages_csv,
        } => {
            let mut cfg = load_config(&config)
                .with_context(|| format!("reading config {}", config.display()))?;
            if let Some(mode) = mode {
                cfg.mode = mode;
            }
            let header_text = fs::read_to_string(&header)
                .with_context(|| format!("reading header {}", header.display()))?;

            let mut solved = vec![load_snapshot_json(&snapshot)
                .with_context(|| format!("reading snapshot {}", snapshot.display()))?];
            if let Some(path) = &resolved {
                solved.push(
                    load_snapshot_json(path)
                        .with_context(|| format!("reading snapshot {}", path.display()))?,
                );
            }
            let mut engine = ReplayEngine::new(solved);

            let snap = engine.solve(&header_text)?;
            println!("{}", post_processing::format_voltage_table(&snap));
            if let Some(path) = &voltages_csv {
                save_voltage_csv(path, &snap)
                    .with_context(|| format!("writing {}", path.display()))?;
            }

            let reduction = reduce_feeder(&snap, &cfg)?;
            println!("{}", post_processing::format_report(&reduction));

            let network = EquivalentNetwork::new(&reduction, &snap, &cfg.emit)?;
            println!("{}", post_processing::format_equivalent_loads(&network));
            write_network(&out, &header_text, &network)
                .with_context(|| format!("writing {}", out.display()))?;

            if resolved.is_some() {
                let resolved_snap = engine.solve(&emit(&header_text, &network))?;
                let verification = verify(&reduction, &cfg.emit.line, &resolved_snap)?;
                println!("{}", post_processing::format_verification(&verification));
            }
        }
        Commands::Voltages { snapshot, csv } => {
            let snap = load_snapshot_json(&snapshot)
                .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
            println!("{}", post_processing::format_voltage_table(&snap));
            if let Some(path) = csv {
                save_voltage_csv(&path, &snap)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
        }
    }
    Ok(())
}
