//! CLI command definitions for the `chatline` binary.

pub mod models;
pub mod user;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Multi-user chat server with streamed, persisted generations.
#[derive(Parser)]
#[command(name = "chatline", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "CHATLINE_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000", env = "CHATLINE_PORT")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1", env = "CHATLINE_HOST")]
        host: String,
    },

    /// Manage users and their API keys.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// List the configured models.
    Models {
        /// Ping each model to verify credentials and connectivity.
        #[arg(long)]
        check: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create a regular user and print a new API key.
    Add {
        /// Unique email handle.
        email: String,

        /// Label stored with the key.
        #[arg(long, default_value = "default")]
        key_name: String,
    },

    /// Create a guest user and print a new API key.
    Guest,

    /// Issue another API key for an existing user.
    Key {
        email: String,

        #[arg(long, default_value = "default")]
        key_name: String,
    },
}
