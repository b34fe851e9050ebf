pub mod daemon_path;
pub mod export;
pub mod filter;
pub mod process;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use export::{ExportCommand, process_export_command};
use process::{restart_server, stop_servers};
use report::{ReportCommand, process_report_command};
use tracing::level_filters::LevelFilter;

use crate::{
    config::{RuleConfig, loader},
    daemon::start_daemon,
    utils::{
        dir::create_application_default_path,
        logging::{CLI_PREFIX, enable_logging},
    },
};

#[derive(Parser, Debug)]
#[command(name = "usage-warden", version, long_about = None)]
#[command(about = "Tracks time spent per application and enforces daily limits", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(long, help = "Configuration file. Defaults to config.json in the application directory")]
        config: Option<PathBuf>,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for debugging"
    )]
    Serve {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(long, help = "Configuration file. Defaults to config.json in the application directory")]
        config: Option<PathBuf>,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Show where the time went")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Export recorded usage as tab separated values")]
    Export {
        #[command(flatten)]
        command: ExportCommand,
    },
    #[command(about = "Validate a configuration file and print it normalized")]
    CheckConfig {
        #[arg(long, help = "Configuration file. Defaults to config.json in the application directory")]
        config: Option<PathBuf>,
        #[arg(long, help = "Print the built-in default configuration", conflicts_with = "config")]
        default: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let app_dir = create_application_default_path()?;
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    match args.commands {
        Commands::Init { dir, config } => restart_server(dir.as_deref(), config.as_deref()),
        Commands::Stop {} => {
            let stopped = stop_servers()?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
        Commands::Serve { dir, config } => {
            start_daemon(dir.unwrap_or(app_dir), config).await?;
            Ok(())
        }
        Commands::Report { command } => process_report_command(command).await,
        Commands::Export { command } => process_export_command(command).await,
        Commands::CheckConfig { config, default } => {
            let config = if default {
                RuleConfig::default()
            } else {
                let path = config.unwrap_or_else(|| app_dir.join(loader::CONFIG_FILE_NAME));
                check_config(&path).await?
            };
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

/// Loads the file without falling back to defaults, the user gets the validation error.
async fn check_config(path: &Path) -> Result<RuleConfig> {
    loader::load(path)
        .await
        .map_err(|e| anyhow::anyhow!("{path:?} is not a valid configuration: {e}"))
}
