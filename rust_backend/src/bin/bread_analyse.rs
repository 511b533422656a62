//! BREAD analysis command-line driver.
//!
//! Reads collected events as JSON, runs the cluster analysis and prints the
//! statistics of every source as JSON on stdout.
//!
//! # Usage
//!
//! ```bash
//! bread-analyse points.json
//! bread-analyse points.json --config bread.toml --mode fast
//! ```
//!
//! The input maps a source name to its events:
//!
//! ```json
//! { "overworld": [ { "x": 0, "y": 64, "z": 0, "w": 3 } ] }
//! ```
//!
//! Events sharing a coordinate are merged by summing their weights.
//!
//! # Exit codes
//!
//! - `0`: statistics printed
//! - `1`: invalid input, configuration or analysis error
//! - `2`: the analysis did not finish before the timeout
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter directives, e.g. `debug` or
//!   `bread_analysis=debug` (default: info)

use std::collections::HashMap;
use std::env;
use std::fs;
use std::sync::mpsc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bread_analysis::{Analyser, AnalyserConfig, CollectionMode, CollectionPeriod, Point};

const USAGE: &str = "Usage: bread-analyse <points.json> [--config <bread.toml>] [--mode fast|semi-fast|normal]";

struct Args {
    input: String,
    config: Option<String>,
    mode: Option<CollectionMode>,
}

fn parse_args() -> Result<Args> {
    let mut input = None;
    let mut config = None;
    let mut mode = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(args.next().context("--config needs a path")?),
            "--mode" => {
                let value = args.next().context("--mode needs a value")?;
                mode = Some(value.parse::<CollectionMode>().map_err(anyhow::Error::msg)?);
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ if input.is_none() => input = Some(arg),
            other => bail!("Unexpected argument: {}\n{}", other, USAGE),
        }
    }

    let input = input.context(USAGE)?;
    Ok(Args {
        input,
        config,
        mode,
    })
}

fn load_config(args: &Args) -> Result<AnalyserConfig> {
    let mut config = match &args.config {
        Some(path) => AnalyserConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => AnalyserConfig::from_default_location().unwrap_or_else(|e| {
            info!("{}; using defaults", e);
            AnalyserConfig::default()
        }),
    };

    if let Some(mode) = args.mode {
        config.collection = CollectionPeriod::Mode(mode);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = load_config(&args)?;

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input))?;
    let events: HashMap<String, Vec<Point>> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", args.input))?;

    let points = events
        .into_iter()
        .map(|(source, events)| (source, Point::merge_by_coordinate(events)))
        .collect::<HashMap<_, _>>();

    info!(
        "Loaded {} sources from {} ({:?})",
        points.len(),
        args.input,
        config.collection
    );

    let (tx, rx) = mpsc::channel();
    let analyser = Analyser::start(points, &config, move |output| {
        let _ = tx.send(output);
    })?;
    analyser.wait();

    match rx.recv().context("Analysis ended without a result")? {
        Ok(Some(stats)) => {
            for (source, world) in &stats {
                info!(
                    "{}: {} clusters, {:.3} events per tick",
                    source,
                    world.clusters.len(),
                    world.total_events_per_tick()
                );
            }
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Ok(None) => {
            warn!("No result within {:?}", config.timeout());
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
