#![deny(warnings)]

//! Headless CLI: builds the loot model, simulates draws, projects economics and
//! writes the tables to a timestamped output directory.

mod config;
mod report;

use anyhow::{bail, Context, Result};
use chrono::Local;
use config::AppConfig;
use loot_core::{InvalidParameterError, PityCurveGenerator, RarityModel};
use loot_econ::project_economics;
use loot_sim::DrawSimulator;
use report::ModelReport;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_OPENS: u64 = 100_000;
const DEFAULT_OUT_DIR: &str = "outputs";

const USAGE: &str = "usage: lootbox [-n|--opens N] [--seed S] [--config FILE] [--out DIR] [--partitions K]";

#[derive(Debug, PartialEq)]
struct Args {
    opens: u64,
    seed: Option<u64>,
    config: Option<PathBuf>,
    out: PathBuf,
    partitions: usize,
    help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            opens: DEFAULT_OPENS,
            seed: None,
            config: None,
            out: PathBuf::from(DEFAULT_OUT_DIR),
            partitions: 1,
            help: false,
        }
    }
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let mut value = || it.next().with_context(|| format!("{arg} needs a value"));
        match arg.as_str() {
            "-n" | "--opens" => {
                let n: i64 = value()?.parse().context("--opens must be an integer")?;
                parsed.opens = u64::try_from(n)
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or(InvalidParameterError::NonPositiveDrawCount)?;
            }
            "--seed" => parsed.seed = Some(value()?.parse().context("--seed must be a u64")?),
            "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "--out" => parsed.out = PathBuf::from(value()?),
            "--partitions" => {
                let k: usize = value()?.parse().context("--partitions must be an integer")?;
                if k == 0 {
                    return Err(InvalidParameterError::NonPositivePartitions.into());
                }
                parsed.partitions = k;
            }
            "-h" | "--help" => parsed.help = true,
            other => bail!("unknown argument: {other}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

/// Compute every table for one run.
fn run(args: &Args, cfg: &AppConfig, generated_at: String) -> Result<ModelReport> {
    let model = RarityModel::from_config(&cfg.model)?;
    let pity = PityCurveGenerator::new(&model, &cfg.model.pity)?;
    let simulator = DrawSimulator::new(&model)?;
    let summary = if args.partitions > 1 {
        simulator.simulate_partitioned(args.opens, args.seed, args.partitions)?
    } else {
        simulator.simulate_seeded(args.opens, args.seed)?
    };
    let projections = project_economics(&cfg.scenarios, &cfg.economics)?;
    info!(
        draws = summary.draws(),
        pity_rows = pity.max_threshold(),
        scenarios = projections.len(),
        "model computed"
    );
    Ok(ModelReport::new(
        generated_at,
        args.seed,
        model.drop_rates(),
        pity.describe_policies(),
        pity.pity_tiers().map(str::to_string).collect(),
        pity.generate(),
        &summary,
        &projections,
    ))
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }
    info!(
        opens = args.opens,
        seed = ?args.seed,
        config = ?args.config,
        git_sha = env!("GIT_SHA"),
        build_date = env!("BUILD_DATE"),
        "starting lootbox model"
    );

    let cfg = config::load(args.config.as_deref())?;
    let now = Local::now();
    let report = run(&args, &cfg, now.to_rfc3339())?;
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    let dir = report::write_outputs(&report, &args.out, &stamp)?;

    println!("Simulated {} opens.", report.draws);
    println!("Tables written to {}", dir.display());
    Ok(())
}
