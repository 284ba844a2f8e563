//! Logging configuration
//!
//! Describes where and how verbosely the engine logs. The subscriber itself is installed
//! by the binary; library crates only emit `tracing` events.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name: trace, debug, info, warn or error
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a file in `log_dir`
    pub file_output: bool,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// File name prefix, followed by a timestamp
    pub file_prefix: String,
    /// Number of log files kept by `cleanup_old_logs`
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
            file_prefix: "dubsync".to_string(),
            max_files: 10,
        }
    }
}

impl LogConfig {
    /// Parse `level`, falling back to INFO for unknown names
    pub fn parse_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }

    /// Create the log directory if needed
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        fs::create_dir_all(&self.log_dir)
    }

    /// Path of the log file for a session started now
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.log_dir
            .join(format!("{}_{}.log", self.file_prefix, stamp))
    }

    /// Delete the oldest log files so that at most `max_files - 1` remain,
    /// leaving room for the file about to be created.
    ///
    /// Returns the number of files removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_dir.exists() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| self.is_own_log(path))
            .collect();

        // Timestamped names sort chronologically
        logs.sort();

        let keep = self.max_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(0);
        }

        let excess = logs.len() - keep;
        for path in &logs[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }

    fn is_own_log(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        path.is_file() && name.starts_with(&self.file_prefix) && name.ends_with(".log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), tracing::Level::INFO);
        config.level = "debug".to_string();
        assert_eq!(config.parse_level(), tracing::Level::DEBUG);
        config.level = "chatty".to_string();
        assert_eq!(config.parse_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_log_path_uses_prefix() {
        let config = LogConfig::default();
        let path = config.current_log_path();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("dubsync_"));
        assert!(name.ends_with(".log"));
        assert!(path.starts_with("logs"));
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            log_dir: dir.path().to_path_buf(),
            max_files: 3,
            ..Default::default()
        };

        for stamp in ["20240101_000000", "20240102_000000", "20240103_000000", "20240104_000000"] {
            fs::write(dir.path().join(format!("dubsync_{}.log", stamp)), b"x").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), b"x").unwrap();

        let removed = config.cleanup_old_logs().unwrap();
        assert_eq!(removed, 2);
        assert!(!dir.path().join("dubsync_20240101_000000.log").exists());
        assert!(!dir.path().join("dubsync_20240102_000000.log").exists());
        assert!(dir.path().join("dubsync_20240104_000000.log").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_cleanup_missing_directory() {
        let config = LogConfig {
            log_dir: PathBuf::from("/nonexistent/dubsync/logs"),
            ..Default::default()
        };
        assert_eq!(config.cleanup_old_logs().unwrap(), 0);
    }
}
