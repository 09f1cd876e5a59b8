use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use appdownload::config::{Config, config_path};
use appdownload::logging::init_logging;
use appdownload::product::ProductRegistry;
use appdownload::sync::{Mode, Synchronizer};
use appdownload::transport::HttpTransport;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "appdownload")]
#[command(
    version,
    about = "Download application updates and build the applist files used for deployment"
)]
struct Cli {
    /// Configuration file (defaults to $APPDOWNLOAD_CONFIG, then ./appdownload.ini)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level when RUST_LOG is not set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check, fetch new versions, then write the applist files (default)
    Run,
    /// Check for updates and record them in the catalog
    Check,
    /// Download the updates recorded in the catalog
    Fetch,
    /// Write the applist files from the catalog
    Export,
    /// Validate the configuration and exit
    Validate,
}

impl Command {
    fn mode(&self) -> Option<Mode> {
        match self {
            Command::Run => Some(Mode::Full),
            Command::Check => Some(Mode::CheckOnly),
            Command::Fetch => Some(Mode::FetchOnly),
            Command::Export => Some(Mode::ExportOnly),
            Command::Validate => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run);
    let path = cli.config.unwrap_or_else(config_path);

    let synchronizer = match Config::load_from(&path).and_then(|config| {
        let transport = Arc::new(HttpTransport::new(config.core.timeout));
        Synchronizer::new(config, &ProductRegistry::with_default_families(), transport)
    }) {
        Ok(synchronizer) => synchronizer,
        Err(e) => {
            eprintln!("appdownload: {}", e);
            return ExitCode::from(appdownload::Error::from(e).exit_code());
        }
    };

    let Some(mode) = command.mode() else {
        println!("Configuration details are validated.");
        return ExitCode::SUCCESS;
    };

    match run(&synchronizer, mode, cli.verbose) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("appdownload: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(synchronizer: &Synchronizer, mode: Mode, verbose: bool) -> anyhow::Result<ExitCode> {
    let _guard = init_logging(synchronizer.config().core.log_dir.as_deref(), verbose)
        .context("failed to initialize logging")?;

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?
        .block_on(synchronizer.run(mode));

    match result {
        Ok(summary) => {
            print!("{}", summary);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("appdownload: {}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
