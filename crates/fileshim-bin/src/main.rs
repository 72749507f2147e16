use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use fileshim_core::config::ShimConfig;
use fileshim_core::protocol::ErrorReply;
use fileshim_core::{server, Bridge, Resolver, RootTable};
use fileshim_native::filesystem::TokioFileSystem;
use fileshim_native::paths::{HostPathProvider, PathOverrides};
use fileshim_platform::paths::PathProvider;

#[derive(Parser, Debug)]
#[command(name = "fileshim")]
#[command(about = "Legacy File-System API bridge for desktop shells")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, env = "FILESHIM_CONFIG_PATH", global = true)]
    config_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "FILESHIM_LOG_LEVEL", global = true)]
    log_level: String,

    /// Override the application root
    #[arg(long, env = "FILESHIM_APPLICATION_DIR", global = true)]
    application_dir: Option<PathBuf>,

    /// Override the data root
    #[arg(long, env = "FILESHIM_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Override the documents root
    #[arg(long, env = "FILESHIM_DOCUMENTS_DIR", global = true)]
    documents_dir: Option<PathBuf>,

    /// Override the cache root
    #[arg(long, env = "FILESHIM_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Override the temp root
    #[arg(long, env = "FILESHIM_TEMP_DIR", global = true)]
    temp_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve framed calls on stdin/stdout until stdin closes
    Serve,
    /// Run a single call and print its JSON result
    Call {
        /// File API method name (e.g., getFile, readAsText)
        method: String,
        /// Positional arguments as a JSON array
        #[arg(default_value = "[]")]
        args: String,
    },
    /// Print the resolved root directories
    Paths,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries protocol frames, so logs go to stderr
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        "fileshim v{} starting (os={}, arch={})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    );

    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(ShimConfig::default_path);

    let mut config = if config_path.exists() {
        info!("loading config from {}", config_path.display());
        ShimConfig::load(&config_path)?
    } else {
        ShimConfig::default()
    };

    // CLI args override config file
    config.application_dir = cli.application_dir.or(config.application_dir);
    config.data_dir = cli.data_dir.or(config.data_dir);
    config.documents_dir = cli.documents_dir.or(config.documents_dir);
    config.cache_dir = cli.cache_dir.or(config.cache_dir);
    config.temp_dir = cli.temp_dir.or(config.temp_dir);

    let bridge = create_bridge(&config)?;

    match cli.command {
        Commands::Serve => {
            server::serve(Arc::new(bridge), tokio::io::stdin(), tokio::io::stdout()).await
        }
        Commands::Call { method, args } => run_call(&bridge, &method, &args).await,
        Commands::Paths => {
            let paths = bridge.resolver().request_all_paths();
            println!("{}", serde_json::to_string_pretty(&paths)?);
            Ok(())
        }
    }
}

fn create_bridge(config: &ShimConfig) -> Result<Bridge> {
    let provider = HostPathProvider::new(&config.qualifier, &config.organization, &config.app_name)
        .with_overrides(PathOverrides {
            application: config.application_dir.clone(),
            data: config.data_dir.clone(),
            documents: config.documents_dir.clone(),
            cache: config.cache_dir.clone(),
            temp: config.temp_dir.clone(),
        });

    let roots = RootTable::new(
        provider
            .root_paths()
            .context("failed to resolve root directories")?,
    );
    Ok(Bridge::new(Resolver::new(Arc::new(TokioFileSystem::new()), roots)))
}

async fn run_call(bridge: &Bridge, method: &str, args: &str) -> Result<()> {
    let args: Vec<serde_json::Value> =
        serde_json::from_str(args).context("arguments must be a JSON array")?;

    match bridge.call(method, &args).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&ErrorReply::from(&e))?);
            anyhow::bail!("{} failed: {}", method, e)
        }
    }
}
