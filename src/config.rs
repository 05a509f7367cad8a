//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};
use clap::Parser;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "countdown-timer")]
#[command(about = "A countdown timer service with pause/resume control over HTTP")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Milliseconds between countdown ticks
    #[arg(short, long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// JSON file used to persist the remaining time
    #[arg(short, long)]
    pub state_file: Option<PathBuf>,

    /// Resume the countdown saved in the state file on startup
    #[arg(short, long, requires = "state_file")]
    pub restore: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Interval between countdown ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
