//! Recorder configuration and loaders.
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use world_core::GuiType;

use crate::error::{RecorderError, Result};
use crate::events::Category;

/// Tunables for one recording session.
///
/// Missing fields in a configuration file fall back to [`Default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Parent directory of session directories.
    pub output_dir: PathBuf,
    /// Session directory name; generated from the start time when unset.
    pub session_id: Option<String>,
    /// Subscribed categories.
    pub categories: Vec<Category>,
    pub flush_interval_ticks: u64,
    pub flush_threshold: usize,
    pub max_buffered_lines: usize,
    /// Ticks before an inspection view opened for an actor is released.
    pub inspection_release_ticks: u64,
    /// Longest pause between position reports that still continues a walk.
    pub segment_gap_ticks: u64,
    /// Longest pause between mining cycles on one resource that still
    /// continues a harvest run.
    pub harvest_gap_ticks: u64,
    /// GUI kinds whose open/close pairs produce session summaries.
    pub tracked_guis: Vec<GuiType>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            session_id: None,
            categories: Category::all().to_vec(),
            flush_interval_ticks: 600,
            flush_threshold: 256,
            max_buffered_lines: 10_000,
            inspection_release_ticks: 60,
            segment_gap_ticks: 30,
            harvest_gap_ticks: 120,
            tracked_guis: vec![GuiType::BlueprintLibrary, GuiType::BlueprintBook],
        }
    }
}

impl RecorderConfig {
    /// Loads a RON configuration file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecorderError::InvalidConfig(format!("Failed to read config file: {}", e))
        })?;

        let config: RecorderConfig = ron::from_str(&content).map_err(|e| {
            RecorderError::InvalidConfig(format!("Failed to parse config RON: {}", e))
        })?;

        Ok(config)
    }

    /// Applies environment overrides on top of `self`.
    ///
    /// Environment variables:
    /// - `RECORDER_OUTPUT_DIR` - Parent directory for session output
    /// - `RECORDER_SESSION_ID` - Session directory name (default: from start time)
    /// - `RECORDER_FLUSH_INTERVAL` - Ticks between periodic flushes (default: 600)
    /// - `RECORDER_FLUSH_THRESHOLD` - Buffered lines that trigger a flush (default: 256)
    /// - `RECORDER_MAX_BUFFERED` - Lines kept per category while the sink fails (default: 10000)
    /// - `RECORDER_RELEASE_TICKS` - Ticks before an inspection view is released (default: 60)
    /// - `RECORDER_HARVEST_GAP` - Ticks between mining cycles that still collate (default: 120)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = env::var("RECORDER_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(session_id) = env::var("RECORDER_SESSION_ID") {
            self.session_id = Some(session_id);
        }
        if let Some(interval) = read_env::<u64>("RECORDER_FLUSH_INTERVAL") {
            self.flush_interval_ticks = interval.max(1);
        }
        if let Some(threshold) = read_env::<usize>("RECORDER_FLUSH_THRESHOLD") {
            self.flush_threshold = threshold.max(1);
        }
        if let Some(max) = read_env::<usize>("RECORDER_MAX_BUFFERED") {
            self.max_buffered_lines = max.max(1);
        }
        if let Some(ticks) = read_env::<u64>("RECORDER_RELEASE_TICKS") {
            self.inspection_release_ticks = ticks;
        }
        if let Some(ticks) = read_env::<u64>("RECORDER_HARVEST_GAP") {
            self.harvest_gap_ticks = ticks;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_ticks == 0 {
            return Err(RecorderError::InvalidConfig(
                "flush_interval_ticks must be positive".into(),
            ));
        }
        if self.flush_threshold == 0 {
            return Err(RecorderError::InvalidConfig(
                "flush_threshold must be positive".into(),
            ));
        }
        if self.max_buffered_lines < self.flush_threshold {
            return Err(RecorderError::InvalidConfig(format!(
                "max_buffered_lines ({}) is below flush_threshold ({})",
                self.max_buffered_lines, self.flush_threshold
            )));
        }
        if let Some(session_id) = &self.session_id
            && (session_id.is_empty() || session_id.contains(['/', '\\']))
        {
            return Err(RecorderError::InvalidConfig(format!(
                "session_id {session_id:?} is not a valid directory name"
            )));
        }
        Ok(())
    }

    /// Configured session id, or one derived from the local start time.
    pub fn resolve_session_id(&self) -> String {
        self.session_id.clone().unwrap_or_else(new_session_id)
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.output_dir.join(session_id)
    }

    pub fn is_tracked(&self, gui: GuiType) -> bool {
        self.tracked_guis.contains(&gui)
    }
}

/// `replay_<YYYYMMDD_HHMMSS>` in local time.
pub fn new_session_id() -> String {
    chrono::Local::now()
        .format("replay_%Y%m%d_%H%M%S")
        .to_string()
}

/// Platform data directory for recordings.
///
/// - Linux: `~/.local/share/session-recorder/replays`
/// - macOS: `~/Library/Application Support/session-recorder/replays`
/// - Fallback: `./replays`
pub fn default_output_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "session-recorder")
        .map(|dirs| dirs.data_dir().join("replays"))
        .unwrap_or_else(|| PathBuf::from("./replays"))
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
