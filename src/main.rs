//! sphere-moments CLI
//!
//! Monte Carlo verification of the sphere moment tensors and of E[V²] for
//! a random tetrahedron inscribed in the unit sphere.

use clap::{Parser, ValueEnum};
use sphere_moments::estimator::{EstimatorConfig, MonteCarloEstimator, DEFAULT_SAMPLE_COUNT};
use sphere_moments::report::Summary;
use sphere_moments::tensor::AnalyticMoments;

/// Compare analytic sphere moments against Monte Carlo estimates.
#[derive(Parser, Debug)]
#[command(name = "sphere-moments", version, about)]
struct Cli {
    /// Number of Monte Carlo samples.
    #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    samples: usize,

    /// Random seed; drawn from OS entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of independent random streams.
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn render(summary: &Summary, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => summary.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(summary)?,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = EstimatorConfig::new(cli.samples).with_workers(cli.workers);
    config.seed = cli.seed;

    let empirical = MonteCarloEstimator::new(config)?.run()?;
    let summary = Summary::new(AnalyticMoments::sphere3(), empirical)?;

    println!("{}", render(&summary, cli.format)?);

    Ok(())
}
