use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dubsync")]
#[command(author, version, about = "Segmented media synchronization engine")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Also write logs to a timestamped file
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Directory for log files
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scripted session over simulated media and print a JSON report
    Replay {
        /// Session project (JSON)
        #[arg(required = true)]
        project: PathBuf,

        /// Timed action script (JSON)
        #[arg(required = true)]
        script: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Validate a session project and optional engine configuration
    Validate {
        /// Session project (JSON)
        project: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
