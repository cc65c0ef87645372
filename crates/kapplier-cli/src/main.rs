//! kapplier - Continuously apply a repository of Kubernetes manifests

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use error::Result;
use util::ConfigArgs;

#[derive(Parser)]
#[command(name = "kapplier")]
#[command(author = "kapplier Contributors")]
#[command(version)]
#[command(about = "Continuously apply a repository of Kubernetes manifests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ~/.config/kapplier/config.yaml)
    #[arg(short, long, global = true, env = "KAPPLIER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directives, overridden by RUST_LOG
    #[arg(long, global = true, env = "KAPPLIER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "KAPPLIER_LOG_JSON")]
    log_json: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every target once
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,

        /// Show command and output of successful targets too
        #[arg(short, long)]
        verbose: bool,
    },

    /// Apply every target on a fixed interval until interrupted
    Daemon {
        #[command(flatten)]
        config: ConfigArgs,

        /// Time between the start of two runs (e.g. "5m")
        #[arg(long, env = "KAPPLIER_INTERVAL", value_parser = util::parse_duration)]
        interval: Option<Duration>,
    },

    /// List the targets found in the manifest repository
    Targets {
        /// Root of the manifest repository
        #[arg(long, env = "KAPPLIER_REPO_PATH")]
        repo_path: Option<PathBuf>,

        /// Only list these namespaces (repeatable or comma-separated)
        #[arg(short, long = "namespace", value_delimiter = ',')]
        namespaces: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the policy each namespace's annotations resolve to
    Policy {
        /// Namespaces to resolve (default: those of the discovered targets)
        #[arg(value_name = "NAMESPACE")]
        names: Vec<String>,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so --json output stays parseable
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            config,
            json,
            verbose,
        } => {
            let config = util::load_config(config_path, &config)?;
            commands::run::run(&config, json, verbose).await
        }

        Commands::Daemon { config, interval } => {
            let mut config = util::load_config(config_path, &config)?;
            if let Some(interval) = interval {
                config.interval = interval;
                config.validate()?;
            }
            commands::daemon::run(&config).await
        }

        Commands::Targets {
            repo_path,
            namespaces,
            json,
        } => {
            let args = ConfigArgs {
                repo_path,
                namespaces,
                ..Default::default()
            };
            let config = util::load_config(config_path, &args)?;
            commands::targets::run(&config, json)
        }

        Commands::Policy {
            names,
            config,
            json,
        } => {
            let config = util::load_config(config_path, &config)?;
            commands::policy::run(&config, &names, json).await
        }
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    if cli.debug {
        // SAFETY: We're the only thread at this point (start of main)
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    let level = if cli.debug { "debug" } else { cli.log_level.as_str() };
    init_tracing(level, cli.log_json);

    let result = tokio::runtime::Runtime::new()
        .map_err(error::CliError::from)
        .and_then(|runtime| runtime.block_on(dispatch(cli)));

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            code
        }
    };
    std::process::exit(code);
}
