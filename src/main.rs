use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use job_footprint::carbon_aware::{CarbonIntensityResolver, SubmissionTimestamp};
use job_footprint::config::FootprintConfig;
use job_footprint::energy::ClusterInfo;
use job_footprint::{footprint, job};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Emit logs as JSON
    #[arg(long, env = "FOOTPRINT_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate energy and emissions for every job in a job table
    Estimate(EstimateArgs),
    /// Resolve carbon intensity for submission timestamps
    Intensity(IntensityArgs),
    /// Show version and build information
    Version,
}

#[derive(Parser, Debug)]
struct ProviderArgs {
    /// TOML configuration file
    #[arg(long, env = "FOOTPRINT_CONFIG")]
    config: Option<PathBuf>,

    /// Carbon intensity provider region id
    #[arg(long, env = "FOOTPRINT_REGION_ID")]
    region_id: Option<u32>,

    /// Fallback intensity in gCO2e/kWh
    #[arg(long, env = "FOOTPRINT_DEFAULT_INTENSITY")]
    default_intensity: Option<f64>,

    /// Carbon intensity provider base URL
    #[arg(long, env = "FOOTPRINT_BASE_URL")]
    base_url: Option<String>,
}

impl ProviderArgs {
    fn load_config(&self) -> anyhow::Result<FootprintConfig> {
        let mut config = match &self.config {
            Some(path) => FootprintConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => FootprintConfig::default(),
        };
        if let Some(region_id) = self.region_id {
            config.carbon.region_id = region_id;
        }
        if let Some(default_intensity) = self.default_intensity {
            config.carbon.default_intensity = default_intensity;
        }
        if let Some(base_url) = &self.base_url {
            config.carbon.base_url = base_url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Parser, Debug)]
struct EstimateArgs {
    /// JSON job table
    #[arg(long)]
    jobs: PathBuf,

    /// YAML cluster capability table
    #[arg(long)]
    cluster: PathBuf,

    /// Use the default intensity for every job without querying the provider
    #[arg(long, env = "FOOTPRINT_OFFLINE")]
    offline: bool,

    /// Write JSON results here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Parser, Debug)]
struct IntensityArgs {
    /// Submission timestamps (RFC 3339 or naive UTC)
    #[arg(required = true)]
    timestamps: Vec<String>,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    match args.command {
        Commands::Version => {
            println!("Job Footprint v{}", env!("CARGO_PKG_VERSION"));
            println!("Build Date: {}", env!("BUILD_DATE"));
            println!("Git SHA: {}", env!("GIT_SHA"));
            println!("Rust Version: {}", env!("RUST_VERSION"));
            Ok(())
        }
        Commands::Estimate(estimate_args) => run_estimate(estimate_args).await,
        Commands::Intensity(intensity_args) => run_intensity(intensity_args).await,
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    // Logs go to stderr so stdout carries only results
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

async fn run_estimate(args: EstimateArgs) -> anyhow::Result<()> {
    let config = args.provider.load_config()?;
    let jobs = job::load_jobs(&args.jobs)
        .with_context(|| format!("loading jobs {}", args.jobs.display()))?;
    let cluster = ClusterInfo::load(&args.cluster)
        .with_context(|| format!("loading cluster table {}", args.cluster.display()))?;

    info!(
        "Estimating footprint for {} jobs on cluster {}",
        jobs.len(),
        cluster.name
    );

    let memory_power = config.energy.memory_power_per_gb;
    let rows = if args.offline {
        info!(
            "Offline mode: using {} gCO2e/kWh for every job",
            config.carbon.default_intensity
        );
        let intensities = vec![config.carbon.default_intensity; jobs.len()];
        footprint::assemble(&jobs, &cluster, memory_power, &intensities)?
    } else {
        let mut resolver = CarbonIntensityResolver::from_config(&config.carbon)?;
        footprint::estimate(&jobs, &cluster, memory_power, &mut resolver).await?
    };

    let rendered = serde_json::to_string_pretty(&rows)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }
    Ok(())
}

async fn run_intensity(args: IntensityArgs) -> anyhow::Result<()> {
    let config = args.provider.load_config()?;
    let mut resolver = CarbonIntensityResolver::from_config(&config.carbon)?;

    let timestamps: Vec<SubmissionTimestamp> = args
        .timestamps
        .into_iter()
        .map(SubmissionTimestamp::from)
        .collect();
    let values = resolver.resolve(&timestamps).await;

    for (ts, value) in timestamps.iter().zip(values) {
        println!("{ts}\t{value}");
    }
    Ok(())
}
