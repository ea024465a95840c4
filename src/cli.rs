//! Command-line interface for nowserving
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Now-serving monitor and announcer for queue kiosks
#[derive(Parser, Debug)]
#[command(
    name = "nowserving",
    version,
    about = "Now-serving monitor and announcer for queue kiosks"
)]
pub struct Cli {
    /// Subcommand to execute (default: run)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log warnings and do not print the board
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Backend base URL (e.g., http://queue.local:3000/api)
    #[arg(long, global = true, value_name = "URL")]
    pub server_url: Option<String>,

    /// Never open the sound card (announcements fall back to local speech)
    #[arg(long, global = true)]
    pub no_audio: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitor until interrupted
    Run,

    /// Fetch the windows once and print the board
    Windows,

    /// Play the chime once
    Chime,

    /// Play a full announcement (chime and speech) for TEXT
    Say {
        /// Text to announce
        text: String,
    },

    /// Check backend, audio output, local speech and video player
    Check,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Install and start the systemd user service
    InstallService,

    /// Stop and remove the systemd user service
    UninstallService,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Get a configuration value by key (e.g., monitor.poll_interval_ms)
    Get {
        /// Dotted key path
        key: String,
    },
}
