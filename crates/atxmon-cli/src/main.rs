use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "atxmon")]
#[command(about = "ATX publication monitor for test network log indices", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> cluster ...)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// Elasticsearch base URL (overrides config and ATXMON_ES_URL)
    #[arg(long, global = true)]
    es_url: Option<String>,

    /// Index name or pattern (default: <index_prefix><UTC date YYYY.MM.DD>)
    #[arg(long, global = true)]
    index: Option<String>,

    /// Layers per epoch of the monitored network (overrides config)
    #[arg(long, global = true)]
    layers_per_epoch: Option<u64>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check count and timing of ATX publications in the last completed epoch
    CheckAtx {
        /// Kubernetes namespace of the test cluster
        namespace: String,

        /// Number of ATXs expected in the monitored epoch
        expected_atx_count: u64,
    },

    /// Print the most recently released layer
    LatestLayer { namespace: String },

    /// Print release ticks, ascending (all layers unless --layer is given)
    LayerTicks {
        namespace: String,

        #[arg(long)]
        layer: Option<u64>,
    },

    /// Print the number of ATXs published in an epoch
    CountAtx { namespace: String, epoch: u64 },

    /// Print the layered config hash + canonical JSON
    ConfigHash,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; CI injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    let overrides = atxmon_config::CliOverrides {
        es_url: cli.es_url,
        index: cli.index,
        layers_per_epoch: cli.layers_per_epoch,
    };

    match cli.cmd {
        Commands::CheckAtx {
            namespace,
            expected_atx_count,
        } => {
            let ctx = commands::Context::load(&cli.config_paths, &overrides)?;
            commands::check::run(&ctx, namespace, expected_atx_count).await?;
        }

        Commands::LatestLayer { namespace } => {
            let ctx = commands::Context::load(&cli.config_paths, &overrides)?;
            commands::inspect::latest_layer(&ctx, namespace).await?;
        }

        Commands::LayerTicks { namespace, layer } => {
            let ctx = commands::Context::load(&cli.config_paths, &overrides)?;
            commands::inspect::layer_ticks(&ctx, namespace, layer).await?;
        }

        Commands::CountAtx { namespace, epoch } => {
            let ctx = commands::Context::load(&cli.config_paths, &overrides)?;
            commands::inspect::count_atx(&ctx, namespace, epoch).await?;
        }

        Commands::ConfigHash => {
            let loaded = commands::load_config(&cli.config_paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only the report.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
