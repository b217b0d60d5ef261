use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rdd_sim::output::{create_timestamped_output_dir, write_observations_csv, write_summary_json};
use rdd_sim::synth::RngSource;
use rdd_sim::{derive_dataset, seeded_rng, ExplanationService, NoiseModel, RunConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NoiseArg {
    Uniform,
    Gaussian,
}

impl From<NoiseArg> for NoiseModel {
    fn from(arg: NoiseArg) -> Self {
        match arg {
            NoiseArg::Uniform => NoiseModel::Uniform,
            NoiseArg::Gaussian => NoiseModel::Gaussian,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "rdd-sim")]
#[command(about = "Simulate a regression discontinuity design and fit both sides of the cutoff")]
struct Cli {
    /// JSON or TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "output-rdd-sim")]
    outdir: PathBuf,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, allow_negative_numbers = true)]
    cutoff: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    effect_size: Option<f64>,

    #[arg(long)]
    noise_level: Option<f64>,

    #[arg(long)]
    sample_size: Option<usize>,

    #[arg(long, allow_negative_numbers = true)]
    slope: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    curvature: Option<f64>,

    #[arg(long, value_enum)]
    noise_model: Option<NoiseArg>,

    /// Ask the text-generation service to explain the run
    #[arg(long, default_value_t = false)]
    explain: bool,

    /// Print observations as JSON instead of writing files
    #[arg(long, default_value_t = false)]
    stdout: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let mut cfg = match &cli.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };

    let sim = &mut cfg.simulation;
    if let Some(v) = cli.cutoff {
        sim.cutoff = v;
    }
    if let Some(v) = cli.effect_size {
        sim.effect_size = v;
    }
    if let Some(v) = cli.noise_level {
        sim.noise_level = v;
    }
    if let Some(v) = cli.sample_size {
        sim.sample_size = v;
    }
    if let Some(v) = cli.slope {
        sim.slope = v;
    }
    if let Some(v) = cli.curvature {
        sim.curvature = v;
    }
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    if let Some(model) = cli.noise_model {
        cfg.noise_model = model.into();
    }

    cfg.validate().context("invalid run configuration")?;
    Ok(cfg)
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    let mut source = RngSource(seeded_rng(cfg.seed));
    let dataset = derive_dataset(&cfg.simulation, &mut source, cfg.noise_model);
    let summary = dataset.summary();

    if cli.stdout {
        let json = serde_json::to_string_pretty(&dataset.observations)
            .context("failed to serialize observations")?;
        println!("{json}");
    } else {
        let run_dir = create_timestamped_output_dir(&cli.outdir)
            .with_context(|| format!("failed to create run directory under {}", cli.outdir.display()))?;
        write_observations_csv(&run_dir.join("observations.csv"), &dataset.observations)
            .context("failed to write observations.csv")?;
        write_summary_json(&run_dir.join("summary.json"), &cfg.simulation, cfg.seed, &summary)
            .context("failed to write summary.json")?;
        info!(dir = %run_dir.display(), "run complete");

        println!(
            "n={} (control {}, treated {})",
            summary.sample_size, summary.control_count, summary.treated_count
        );
        println!(
            "control: y = {:.4} x + {:.4}",
            summary.control_fit.slope, summary.control_fit.intercept
        );
        println!(
            "treated: y = {:.4} x + {:.4}",
            summary.treated_fit.slope, summary.treated_fit.intercept
        );
        println!(
            "jump at cutoff {}: estimated {:.4}, true {:.4}",
            cfg.simulation.cutoff, summary.estimated_jump, summary.true_effect
        );
        println!("Output directory: {}", run_dir.display());
    }

    if cli.explain {
        let service = ExplanationService::from_env(&cfg.explain);
        if !service.is_available() {
            info!(var = %cfg.explain.api_key_env, "no credential set, explanation unavailable");
        }
        println!("\n{}", service.explain(&cfg.simulation));
    }

    Ok(())
}
