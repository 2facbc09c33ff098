//! Command-line configuration.

use std::path::PathBuf;

use clap::Parser;
use strome_core::StoreConfig;
use strome_proto::EncodeOptions;

/// Default minimum age used by the fetch step.
pub const DEFAULT_MIN_AGE: i64 = 18;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "strome-demo")]
#[command(version, about = "Walk the sample user through the Strome entity mapping", long_about = None)]
pub struct Args {
    /// Path to the database storage directory.
    #[arg(short, long, default_value = "./strome_data")]
    pub data_path: PathBuf,

    /// Keep records in memory instead of on disk.
    #[arg(long)]
    pub memory: bool,

    /// Pretty-print dictionaries.
    #[arg(long)]
    pub pretty: bool,

    /// Print the registered entity schemas and exit.
    #[arg(long)]
    pub schema: bool,

    /// Minimum age for the fetch step.
    #[arg(long, default_value_t = DEFAULT_MIN_AGE)]
    pub min_age: i64,

    /// Page cache size in megabytes.
    #[arg(long, default_value_t = 64)]
    pub cache_mb: u64,
}

impl Args {
    /// Store configuration for the on-disk store.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.data_path)
            .with_cache_capacity(self.cache_mb * 1024 * 1024)
            .with_pretty(self.pretty)
    }

    /// Dictionary encoding for printed output.
    pub fn encode_options(&self) -> EncodeOptions {
        if self.pretty {
            EncodeOptions::pretty()
        } else {
            EncodeOptions::compact()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["strome-demo"]);
        assert!(!args.memory);
        assert_eq!(args.min_age, DEFAULT_MIN_AGE);

        let config = args.store_config();
        assert_eq!(config.path, PathBuf::from("./strome_data"));
        assert_eq!(config.cache_capacity, 64 * 1024 * 1024);
        assert!(!config.pretty);
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "strome-demo",
            "--memory",
            "--pretty",
            "--data-path",
            "/tmp/strome",
            "--min-age",
            "40",
        ]);
        assert!(args.memory);
        assert!(args.encode_options().pretty);
        assert!(args.store_config().pretty);
        assert_eq!(args.store_config().path, PathBuf::from("/tmp/strome"));
        assert_eq!(args.min_age, 40);
    }
}
