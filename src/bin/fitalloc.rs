//! fitalloc workload runner
//!
//! Replays a workload script against a fresh allocator and prints the
//! allocator's responses.

use anyhow::{bail, Context};
use clap::Parser;
use fitalloc::{parse_script, AllocatorBuilder, AllocatorConfig, FitPolicy, StatsFormat, Workload};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fitalloc")]
#[command(about = "Replay allocation workloads against a fixed-size arena")]
struct Args {
    /// Workload script (one command per line)
    script: PathBuf,

    /// Arena size in bytes (required unless --config is given)
    #[arg(short = 'c', long)]
    capacity: Option<usize>,

    /// Fit policy (first-fit, best-fit, worst-fit) [default: first-fit]
    #[arg(short = 'p', long)]
    policy: Option<String>,

    /// TOML configuration file providing capacity and policy
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print statistics as JSON lines
    #[arg(long)]
    json: bool,
}

/// `RUST_LOG` when set, otherwise warnings only so stdout carries just the results
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(log_filter())
        .init();

    let args = Args::parse();

    let mut builder = AllocatorBuilder::new();
    if let Some(path) = &args.config {
        let config = AllocatorConfig::from_path(path)
            .with_context(|| format!("loading config {:?}", path))?;
        builder = builder.config(config);
    }
    if let Some(capacity) = args.capacity {
        builder = builder.capacity(capacity);
    }
    if let Some(policy) = &args.policy {
        builder = builder.policy(policy.parse::<FitPolicy>()?);
    }
    if args.config.is_none() && args.capacity.is_none() {
        bail!("either --capacity or --config must be given");
    }

    let allocator = builder.build().context("initializing allocator")?;
    info!(
        "Running {:?} on {} byte arena ({})",
        args.script,
        allocator.capacity(),
        allocator.policy()
    );

    let source = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {:?}", args.script))?;
    let steps = parse_script(&source)?;

    let format = if args.json { StatsFormat::Json } else { StatsFormat::Text };
    let mut workload = Workload::new(allocator).with_format(format);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    workload.run(&steps, &mut out)?;
    out.flush()?;

    workload.into_allocator().destroy();
    Ok(())
}
