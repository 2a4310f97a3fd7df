//! `histolab` — run histopathology lab simulation jobs from the command
//! line.
//!
//! `histolab run --config job.json --seed 42 --out results/` writes one
//! result document per replication (`rep_0.json`, `rep_1.json`, …).
//! `histolab sample-config` emits a complete starting-point document.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use histolab_config::Config;
use histolab_model::run_job;

#[derive(Parser)]
#[command(name = "histolab", version, about = "Histopathology lab discrete-event simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a simulation job and write one result file per replication.
    Run {
        /// Path to the job configuration (JSON).
        #[arg(long)]
        config: PathBuf,

        /// Root seed; replication r derives its own stream from (seed, r).
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Output directory for result documents.
        #[arg(long, default_value = "results")]
        out: PathBuf,

        /// Override the config's replication count.
        #[arg(long)]
        reps: Option<u32>,
    },

    /// Write a complete sample configuration document.
    SampleConfig {
        #[arg(long, default_value = "histolab-config.json")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run {
            config,
            seed,
            out,
            reps,
        } => run(&config, seed, &out, reps),
        Command::SampleConfig { out } => {
            let doc = serde_json::to_string_pretty(&histolab_config::samples::sample_config())?;
            fs::write(&out, doc).with_context(|| format!("writing {}", out.display()))?;
            info!(path = %out.display(), "sample config written");
            Ok(())
        }
    }
}

fn run(config_path: &PathBuf, seed: u64, out: &PathBuf, reps: Option<u32>) -> anyhow::Result<()> {
    let mut config = Config::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(reps) = reps {
        config.num_reps = reps;
        config.validate()?;
    }

    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    info!(
        reps = config.num_reps,
        sim_hours = config.sim_hours,
        seed,
        "job started"
    );

    let results = run_job(&config, seed);
    let mut completed = 0usize;
    for (rep, outcome) in results.iter().enumerate() {
        match outcome {
            Ok(doc) => {
                let path = out.join(format!("rep_{rep}.json"));
                let body = serde_json::to_vec(doc)?;
                fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
                completed += 1;
            }
            Err(err) => error!(rep, %err, "replication aborted"),
        }
    }

    info!(
        completed,
        failed = results.len() - completed,
        "job finished"
    );
    if completed == 0 {
        bail!("all {} replication(s) failed", results.len());
    }
    Ok(())
}
