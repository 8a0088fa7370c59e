use anyhow::Context;
use clap::Parser;
use geogrid_histogram::{Histogram, HistogramConfig};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "geogrid-histogram", about = "Post counts and top hashtags per grid cell")]
struct Args {
    /// Grid definition (GeoJSON features with id/xmin/xmax/ymin/ymax)
    #[arg(long, default_value = geogrid_histogram::config::DEFAULT_GRID_FILE)]
    grid: PathBuf,

    /// Line-delimited JSON posts
    #[arg(short, long, default_value = geogrid_histogram::config::DEFAULT_INPUT_FILE)]
    input: PathBuf,

    /// Number of workers, defaults to the number of CPUs
    #[arg(short = 'n', long)]
    workers: Option<usize>,

    /// Distinct hashtag frequencies reported per cell
    #[arg(long, default_value_t = geogrid_histogram::merge::DEFAULT_TOP_N)]
    top: usize,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> HistogramConfig {
        let defaults = HistogramConfig::default();
        HistogramConfig {
            grid_path: self.grid,
            input_path: self.input,
            workers: self.workers.unwrap_or(defaults.workers),
            top_n: self.top,
            ..defaults
        }
    }
}

// RUST_LOG wins over -v.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(verbose >= 3)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.into_config();
    debug!("Configuration: {:?}", config);

    let histogram = Histogram::from_config(&config).context("failed to set up histogram")?;
    let report = histogram
        .run_file(&config.input_path)
        .with_context(|| format!("failed to process {}", config.input_path.display()))?;

    print!("{}", report);
    Ok(())
}
