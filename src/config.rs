//! Runtime configuration for the onion vanity address generator.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::matcher::Pattern;
use crate::worker::{SearchConfig, SearchError};

/// Tor v3 Onion Vanity Address Generator
#[derive(Parser, Debug, Clone)]
#[command(name = "onion-vanity", author, version, about, long_about = None)]
pub struct Config {
    /// Regular expression the address must match (e.g. "^abc")
    #[arg(short = 'e', long = "regexp")]
    pub regexp: String,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Case insensitive matching
    #[arg(short = 'i', long, default_value = "false")]
    pub ignore_case: bool,

    /// Give up after roughly N generated keys
    #[arg(long)]
    pub max_attempts: Option<u64>,

    /// Give up after SECS seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Progress report interval in seconds
    #[arg(short = 'r', long, default_value = "5")]
    pub report_interval: u64,

    /// Also write the key as a Tor hidden service directory under DIR
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

impl Config {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Validates the configuration and builds the search parameters.
    ///
    /// Fails with `InvalidPattern` or `InvalidWorkerCount` before any work starts.
    pub fn search_config(&self) -> Result<SearchConfig, SearchError> {
        let pattern = Pattern::with_case(&self.regexp, self.ignore_case)?;

        let mut config = SearchConfig::new(pattern, self.worker_count())?
            .with_report_interval(Duration::from_secs(self.report_interval));
        if let Some(max_attempts) = self.max_attempts {
            config = config.with_max_attempts(max_attempts);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}
