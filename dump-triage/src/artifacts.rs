//! Canonical paths for the artifacts one analysis run produces.
//!
//! The suffix constants are shared between the execution bridge (which
//! locates engine output) and report ingestion (which loads it), so the two
//! sides can never drift apart.

use std::path::{Path, PathBuf};

/// Structured summary document, the primary machine-readable artifact.
pub const SUMMARY_SUFFIX: &str = "_TriageSummary.json";
/// Free-text report intended for humans.
pub const REPORT_SUFFIX: &str = "_TriageReport.txt";
/// Line-oriented event log, one event per line, oldest first.
pub const EVENT_LOG_SUFFIX: &str = "_TriageEvents.jsonl";
/// Wait-chain snapshot captured at dump time.
pub const WAIT_CHAIN_SUFFIX: &str = "_TriageWaitChain.json";
/// Side log written when the in-process engine call fails unexpectedly.
pub const ENGINE_ERROR_LOG_SUFFIX: &str = "_TriageEngineError.log";

/// Resolve the directory engine artifacts are written to: an explicit,
/// non-empty choice wins, otherwise the dump's parent directory.
pub fn resolve_output_dir(dump_path: &Path, preferred: Option<&Path>) -> PathBuf {
    if let Some(dir) = preferred {
        if !dir.as_os_str().is_empty() {
            return dir.to_path_buf();
        }
    }
    match dump_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn summary_path(dump_path: &Path, out_dir: &Path) -> PathBuf {
    artifact_path(dump_path, out_dir, SUMMARY_SUFFIX)
}

pub fn report_path(dump_path: &Path, out_dir: &Path) -> PathBuf {
    artifact_path(dump_path, out_dir, REPORT_SUFFIX)
}

pub fn event_log_path(dump_path: &Path, out_dir: &Path) -> PathBuf {
    artifact_path(dump_path, out_dir, EVENT_LOG_SUFFIX)
}

pub fn wait_chain_path(dump_path: &Path, out_dir: &Path) -> PathBuf {
    artifact_path(dump_path, out_dir, WAIT_CHAIN_SUFFIX)
}

pub fn engine_error_log_path(dump_path: &Path, out_dir: &Path) -> PathBuf {
    artifact_path(dump_path, out_dir, ENGINE_ERROR_LOG_SUFFIX)
}

/// `outDir / (dump file name without extension + suffix)`.
fn artifact_path(dump_path: &Path, out_dir: &Path, suffix: &str) -> PathBuf {
    let stem = dump_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{}{}", stem, suffix))
}
