//! JSON-lines pipeline logging.
//!
//! One line per pipeline run, appended to `<log_dir>/pipeline.jsonl`.
//! Logging is opt-in via [`crate::config::EngineConfig::log_pipeline`] and
//! failures are swallowed by the caller so a full disk never breaks a run.

use std::fs::{create_dir_all, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::EngineResult;

pub const PIPELINE_LOG_FILE: &str = "pipeline.jsonl";

/// One pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineLogEntry<'a> {
    pub timestamp_ms: u128,
    pub transform: &'a str,
    pub image_id: &'a str,
    pub forward_cache_hit: bool,
    /// `None` when the run carried no filter.
    pub filtered_cache_hit: Option<bool>,
    pub cancelled: bool,
    pub duration_ms: u128,
}

/// Milliseconds since the Unix epoch; zero if the clock is unset.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Append one serialized entry to `<dir>/<file>` as a single JSON line,
/// creating the directory on first use.
pub fn append_json_line(dir: &Path, file: &str, entry: &impl Serialize) -> EngineResult<()> {
    create_dir_all(dir)?;
    let line = serde_json::to_string(entry)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    let mut handle = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(file))?;
    writeln!(handle, "{}", line)?;
    Ok(())
}
