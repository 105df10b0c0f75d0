mod logging;
mod run;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

use apitester_core::Config;

#[derive(Parser)]
#[command(name = "apitester", version)]
#[command(about = "Run declarative HTTP test suites and stream their results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Directory holding suites and results
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Run a YAML or JSON suite file once, without storing results
    Run {
        /// Path to the suite file
        file: PathBuf,
        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the full run as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if let Commands::Config = cli.command {
        print!("{}", Config::default_config_string());
        return Ok(());
    }

    logging::init();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            data_dir,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(dir) = data_dir {
                config.storage.data_dir = dir.to_string_lossy().to_string();
            }
            serve::start_server(config).await
        }
        Commands::Run {
            file,
            timeout,
            json,
        } => {
            if let Some(secs) = timeout {
                config.runner.request_timeout_secs = secs;
                config.validate()?;
            }
            let passed = run::run_file(&config, &file, json).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Config => Ok(()),
    }
}
