//! releasechan CLI - container release channel lookups

use anyhow::Result;
use clap::{Parser, Subcommand};
use releasechan_core::Config;
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{cmd_check, cmd_config_init, cmd_config_show, cmd_query, cmd_serve};
use logging::{init_cli_logging, init_daemon_logging};

#[derive(Parser)]
#[command(name = "releasechan", version)]
#[command(about = "Look up container images by release channel")]
#[command(after_help = "\
QUICK START:
  releasechan config init                  # Write releasechan.toml
  releasechan check                        # Validate the release document
  releasechan serve --foreground           # Run the daemon with live reload
  releasechan query --container app        # All channels for a container")]
struct Cli {
  /// Config file (default: ./releasechan.toml, then the user config)
  #[arg(long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

/// Subcommands for `releasechan config`
#[derive(Subcommand)]
pub enum ConfigCommand {
  /// Show effective configuration
  Show,
  /// Write a config template to the current directory
  Init {
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand)]
enum Commands {
  /// Start the daemon
  Serve {
    /// Release document (overrides data.file)
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,
    /// Log to the console instead of the log file
    #[arg(long)]
    foreground: bool,
  },
  /// Look up releases in a release document
  Query {
    /// Release document (overrides data.file)
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,
    /// Filter by container
    #[arg(short, long)]
    container: Option<String>,
    /// Filter by release channel
    #[arg(long = "channel")]
    release_channel: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
  /// Validate a release document and report rejected records
  Check {
    /// Release document (overrides data.file)
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,
  },
  /// Configuration management
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let cwd = std::env::current_dir()?;
  let config = Config::resolve(cli.config.as_deref(), &cwd)?;

  // Use file logging for the daemon, console-only for other commands
  let _guard = match &cli.command {
    Commands::Serve { foreground, .. } => init_daemon_logging(&config.daemon, *foreground),
    _ => {
      init_cli_logging();
      None
    }
  };

  match cli.command {
    Commands::Serve { file, .. } => cmd_serve(&config, file).await,
    Commands::Query {
      file,
      container,
      release_channel,
      json,
    } => cmd_query(&config, file, container.as_deref(), release_channel.as_deref(), json).await,
    Commands::Check { file } => cmd_check(&config, file).await,
    Commands::Config { command } => match command {
      ConfigCommand::Show => cmd_config_show(&config, cli.config.as_deref(), &cwd),
      ConfigCommand::Init { force } => cmd_config_init(&cwd, force),
    },
  }
}
