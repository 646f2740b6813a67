//! fabricsync
//!
//! Runs and operates the fabric reconciliation service.
//!
//! # Commands
//!
//! - `run` - Run the sync service until interrupted
//! - `sync-once` - Run a single reconciliation pass
//! - `list` - Print journal entries
//! - `network`, `port` - Journal resource changes
//! - `agent` - Talk to the fabric controller directly

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::ServiceConfig;
use fabric_agent::FabricOperation;
use fabric_journal::EntryState;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fabric reconciliation service and journal tools.
#[derive(Parser)]
#[command(name = "fabricsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Path to the journal document (overrides the configuration file)
    #[arg(global = true, short, long)]
    journal: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync service until Ctrl-C
    Run,

    /// Run one reconciliation pass and print its report
    SyncOnce,

    /// Print journal entries
    List {
        /// Only show entries in this state (pending, waiting, failed, completed)
        #[arg(short, long)]
        state: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Journal a network change
    #[command(subcommand)]
    Network(NetworkCommand),

    /// Journal a port change
    #[command(subcommand)]
    Port(PortCommand),

    /// Send a command to the fabric controller
    #[command(subcommand)]
    Agent(AgentCommand),

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum NetworkCommand {
    /// Journal a new network
    Create {
        /// Network id
        id: String,

        /// Virtual fabric name
        fabric_id: String,

        /// Partition key
        #[arg(short, long)]
        key: u64,
    },

    /// Journal the deletion of a network
    Delete {
        /// Network id
        id: String,
    },
}

#[derive(Subcommand)]
enum PortCommand {
    /// Journal a new port
    Create {
        /// Port id
        id: String,

        /// Virtual fabric the port joins
        network_id: String,

        /// Member identifier; ports without one are not fabric ports
        #[arg(short, long)]
        member: Option<String>,
    },

    /// Journal that a port was bound
    Bind {
        /// Port id
        id: String,
    },

    /// Journal the deletion of a port
    Delete {
        /// Port id
        id: String,
    },
}

#[derive(Subcommand)]
enum AgentCommand {
    /// Commit staged configuration
    Commit,
    /// Reload committed configuration
    Reload,
    /// Restart the controller
    Restart,
    /// Discard staged configuration
    Reset,
    /// Kill outstanding controller processes
    Abort,

    /// Report whether a member is in a virtual fabric
    PortStatus {
        /// Virtual fabric name
        fabric: String,

        /// Member identifier
        member: String,
    },

    /// Report whether a virtual fabric exists
    Exists {
        /// Virtual fabric name
        fabric: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServiceConfig::load_or_default(cli.config.as_deref())?.with_journal_path(cli.journal);

    match cli.command {
        Commands::Run => commands::run::run(&config)?,
        Commands::SyncOnce => commands::sync_once::run(&config)?,
        Commands::List { state, format } => {
            let state = state.map(|s| s.parse::<EntryState>()).transpose()?;
            commands::list::run(&config.journal_path, state, &format)?;
        }
        Commands::Network(NetworkCommand::Create { id, fabric_id, key }) => {
            commands::journal::network_create(&config.journal_path, &id, &fabric_id, key)?;
        }
        Commands::Network(NetworkCommand::Delete { id }) => {
            commands::journal::network_delete(&config.journal_path, &id)?;
        }
        Commands::Port(PortCommand::Create {
            id,
            network_id,
            member,
        }) => {
            commands::journal::port_create(&config.journal_path, &id, &network_id, member.as_deref())?;
        }
        Commands::Port(PortCommand::Bind { id }) => {
            commands::journal::port_bind(&config.journal_path, &id)?;
        }
        Commands::Port(PortCommand::Delete { id }) => {
            commands::journal::port_delete(&config.journal_path, &id)?;
        }
        Commands::Agent(command) => match command {
            AgentCommand::PortStatus { fabric, member } => {
                commands::agent::port_status(&config.agent, &fabric, &member)?;
            }
            AgentCommand::Exists { fabric } => commands::agent::exists(&config.agent, &fabric)?,
            AgentCommand::Commit => commands::agent::management(&config.agent, FabricOperation::Commit)?,
            AgentCommand::Reload => commands::agent::management(&config.agent, FabricOperation::Reload)?,
            AgentCommand::Restart => commands::agent::management(&config.agent, FabricOperation::Restart)?,
            AgentCommand::Reset => commands::agent::management(&config.agent, FabricOperation::Reset)?,
            AgentCommand::Abort => commands::agent::management(&config.agent, FabricOperation::Abort)?,
        },
        Commands::Version => {
            println!("fabricsync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
