//! Command line arguments

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use sonar_ble::{BroadcasterConfig, InvariantPolicy};

/// Run the Sonar broadcaster against a simulated peripheral
#[derive(Parser, Debug)]
#[command(name = "sonar-broadcaster", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Include the local name in the advertisement
    #[arg(long)]
    pub include_name: bool,

    /// Local name to advertise when name advertising is enabled
    #[arg(long)]
    pub local_name: Option<String>,

    /// Panic on invariant violations instead of logging them
    #[arg(long)]
    pub strict: bool,

    /// Keepalive period in seconds
    #[arg(long)]
    pub keepalive_secs: Option<u64>,

    /// Identity rotation period in seconds
    #[arg(long, default_value_t = 30)]
    pub rotate_secs: u64,

    /// Health report period in seconds
    #[arg(long, default_value_t = 10)]
    pub health_secs: u64,

    /// Make every Nth identity rotation hit a full transmit queue (0 disables)
    #[arg(long, default_value_t = 0)]
    pub backpressure_every: u32,
}

impl Cli {
    /// Apply flag overrides on top of file or default configuration
    pub fn apply_overrides(&self, mut config: BroadcasterConfig) -> BroadcasterConfig {
        if self.include_name {
            config.include_local_name = true;
        }
        if self.strict {
            config.invariant_policy = InvariantPolicy::Strict;
        }
        if let Some(name) = &self.local_name {
            config = config.with_local_name(name.clone());
        }
        if let Some(secs) = self.keepalive_secs {
            config = config.with_keepalive_interval(Duration::from_secs(secs));
        }
        config
    }
}
