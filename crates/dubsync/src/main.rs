//! DubSync - Segmented media synchronization engine
//!
//! Command-line front end: replays scripted editing sessions over simulated media and
//! validates project and configuration files.

#![warn(missing_docs)]

mod cli;
mod logging_setup;
mod replay;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use dubsync_core::{LogConfig, SessionProject, SyncConfig};
use replay::{Replayer, Script};
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: cli.log_level.clone(),
        file_output: cli.log_file,
        log_dir: cli.log_dir.clone(),
        ..LogConfig::default()
    };
    let _log_guard = logging_setup::init(&log_config)?;

    match cli.command {
        Commands::Replay {
            project,
            script,
            config,
            compact,
        } => run_replay(&project, &script, config.as_deref(), compact),
        Commands::Validate { project, config } => validate(&project, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {:?}", path)),
        None => Ok(SyncConfig::default()),
    }
}

fn load_project(path: &Path) -> Result<SessionProject> {
    SessionProject::load(path).with_context(|| format!("Failed to load project: {:?}", path))
}

fn run_replay(project: &Path, script: &Path, config: Option<&Path>, compact: bool) -> Result<()> {
    let config = load_config(config)?;
    let project = load_project(project)?;
    let script = Script::load(script)?;
    info!(
        project = %project.name,
        steps = script.steps.len(),
        "Starting replay"
    );

    let mut replayer = Replayer::new(&project, config)?;
    replayer.run(&script)?;
    let report = replayer.finish();

    let json = if compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);
    Ok(())
}

fn validate(project: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let project = load_project(project)?;
    let segments: usize = project.tracks.iter().map(|t| t.segments.len()).sum();
    println!(
        "{}: {} track(s), {} segment(s), duration {:.3}s",
        project.name,
        project.tracks.len(),
        segments,
        project.duration
    );
    println!(
        "seek throttle {} ms, keyframe interval {}s",
        config.seek_throttle_ms, config.keyframe_interval
    );
    Ok(())
}
