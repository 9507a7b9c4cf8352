//! Loads the engine's structured summary document and sibling artifacts.
//!
//! The only hard failure is a summary document that cannot be opened or is
//! not valid JSON. Inside a valid document every field is read defensively:
//! a missing key, a wrong type, or a malformed list element degrades to that
//! field's zero value while the rest of the report still loads. The engine
//! has renamed and dropped fields across versions, so nothing here may
//! assume more shape than it can see.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;
use tracing::error;

use crate::summary::{AnalysisSummary, EvidenceItem, ResourceItem, Suspect};

/// Failure to open or parse the summary document itself. Field-level
/// problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("could not open summary document: {0}")]
    Io(#[from] std::io::Error),
    #[error("summary document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load and parse the structured summary document at `summary_path`.
pub fn load_summary(summary_path: &Path) -> Result<AnalysisSummary, IngestError> {
    let file = File::open(summary_path).map_err(|e| {
        error!("could not open summary document at {:?}", summary_path);
        e
    })?;
    let root: Value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        error!("summary document was not valid JSON");
        e
    })?;
    Ok(summary_from_value(&root))
}

/// Build the display model from an already-parsed document. Never fails.
pub fn summary_from_value(root: &Value) -> AnalysisSummary {
    let exception = root.get("exception");
    let analysis = root.get("analysis");

    let suspects = object_array(root, "suspects", |item| Suspect {
        confidence: read_string(Some(item), "confidence"),
        module: first_non_blank(&[
            read_string(Some(item), "module_filename"),
            read_string(Some(item), "module_path"),
            read_string(Some(item), "inferred_mod_name"),
        ]),
        reason: read_string(Some(item), "reason"),
    });

    let evidence_items = object_array(root, "evidence", |item| EvidenceItem {
        confidence: read_string(Some(item), "confidence"),
        title: read_string(Some(item), "title"),
        details: read_string(Some(item), "details"),
    });

    let resource_items = object_array(root, "resources", |item| {
        let providers = string_array(item, "providers");
        let kind = read_string(Some(item), "kind");
        ResourceItem {
            kind: if kind.trim().is_empty() {
                "resource".to_string()
            } else {
                kind
            },
            path: read_string(Some(item), "path"),
            providers: if providers.is_empty() {
                "-".to_string()
            } else {
                providers.join(", ")
            },
            conflict: if read_bool(Some(item), "is_conflict") {
                "conflict".to_string()
            } else {
                String::new()
            },
        }
    });

    let inferred_mod_name = first_non_blank(&[
        read_string(exception, "inferred_mod_name"),
        suspects
            .first()
            .map(|s| s.module.clone())
            .unwrap_or_default(),
    ]);

    let history_correlation_count = match root.get("history_correlation") {
        Some(Value::Object(correlation)) => match correlation.get("count") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            _ => 0,
        },
        _ => 0,
    };

    let troubleshooting = match root.get("troubleshooting_steps") {
        Some(node @ Value::Object(_)) => Some(node),
        _ => None,
    };

    AnalysisSummary {
        summary_sentence: read_string(Some(root), "summary_sentence"),
        crash_bucket_key: read_string(Some(root), "crash_bucket_key"),
        module_plus_offset: read_string(exception, "module_plus_offset"),
        inferred_mod_name,
        is_crash_like: read_bool(analysis, "is_crash_like"),
        is_hang_like: read_bool(analysis, "is_hang_like"),
        is_snapshot_like: read_bool(analysis, "is_snapshot_like"),
        is_manual_capture: read_bool(analysis, "is_manual_capture"),
        suspects,
        recommendations: string_array(root, "recommendations"),
        callstack_frames: string_array(root, "callstack.frames"),
        evidence_items,
        resource_items,
        history_correlation_count,
        troubleshooting_title: read_string(troubleshooting, "title"),
        troubleshooting_steps: troubleshooting
            .map(|node| string_array(node, "steps"))
            .unwrap_or_default(),
    }
}

/// Free-text report. An absent or unreadable file is just empty.
pub fn load_report_text(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Event log lines, oldest first. Blank lines are dropped; callers apply
/// their own tail cap.
pub fn load_event_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.trim_end().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Wait-chain snapshot: pretty-printed when it parses as JSON, verbatim
/// text otherwise, empty when absent.
pub fn load_wait_chain(path: &Path) -> String {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return String::new(),
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(raw),
        Err(_) => raw,
    }
}

/// A named field read as a string only if it is exactly a string; anything
/// else is the empty string.
fn read_string(node: Option<&Value>, name: &str) -> String {
    match node.and_then(|n| n.get(name)) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Booleans accept a native bool or a number read truthy-if-nonzero.
fn read_bool(node: Option<&Value>, name: &str) -> bool {
    match node.and_then(|n| n.get(name)) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map_or(false, |v| v != 0),
        _ => false,
    }
}

/// Walk a dotted path ("callstack.frames") and collect the trimmed,
/// non-blank strings of the array it lands on. If any intermediate segment
/// is absent or not an object, the result is empty.
fn string_array(root: &Value, path: &str) -> Vec<String> {
    let mut node = root;
    for segment in path.split('.') {
        match node.get(segment) {
            Some(next) => node = next,
            None => return Vec::new(),
        }
    }
    match node {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    }
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Map each element of an array field independently; a malformed element
/// degrades to its mapper's defaults instead of dropping the whole list.
fn object_array<T>(root: &Value, name: &str, mapper: impl Fn(&Value) -> T) -> Vec<T> {
    match root.get(name) {
        Some(Value::Array(items)) => items.iter().map(mapper).collect(),
        _ => Vec::new(),
    }
}

/// First entry that is not blank after trimming, trimmed; empty otherwise.
fn first_non_blank(values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_fields_require_exact_types() {
        let doc = json!({
            "summary_sentence": 42,
            "crash_bucket_key": null,
            "exception": { "module_plus_offset": ["not", "a", "string"] },
        });
        let summary = summary_from_value(&doc);
        assert_eq!(summary.summary_sentence, "");
        assert_eq!(summary.crash_bucket_key, "");
        assert_eq!(summary.module_plus_offset, "");
    }

    #[test]
    fn numeric_booleans_are_truthy_if_nonzero() {
        let doc = json!({ "analysis": {
            "is_crash_like": 1,
            "is_hang_like": 0,
            "is_snapshot_like": "yes",
            "is_manual_capture": true,
        }});
        let summary = summary_from_value(&doc);
        assert!(summary.is_crash_like);
        assert!(!summary.is_hang_like);
        assert!(!summary.is_snapshot_like);
        assert!(summary.is_manual_capture);
    }

    #[test]
    fn dotted_path_resolves_through_objects() {
        let doc = json!({ "callstack": { "frames": ["a", "b"] } });
        assert_eq!(summary_from_value(&doc).callstack_frames, vec!["a", "b"]);

        let doc = json!({ "callstack": {} });
        assert!(summary_from_value(&doc).callstack_frames.is_empty());

        let doc = json!({ "callstack": "frames" });
        assert!(summary_from_value(&doc).callstack_frames.is_empty());
    }

    #[test]
    fn blank_list_entries_are_dropped_and_trimmed() {
        let doc = json!({ "recommendations": ["  update it  ", "", "   ", 7, "retry"] });
        let summary = summary_from_value(&doc);
        assert_eq!(summary.recommendations, vec!["update it", "retry"]);
    }

    #[test]
    fn explicit_inferred_mod_name_wins_over_suspects() {
        let doc = json!({
            "exception": { "inferred_mod_name": " ModB " },
            "suspects": [{ "module_filename": "X" }, { "module_filename": "Y" }],
        });
        assert_eq!(summary_from_value(&doc).inferred_mod_name, "ModB");
    }

    #[test]
    fn inferred_mod_name_falls_back_to_first_suspect() {
        let doc = json!({
            "exception": { "inferred_mod_name": "  " },
            "suspects": [{ "module_filename": "X" }, { "module_filename": "Y" }],
        });
        assert_eq!(summary_from_value(&doc).inferred_mod_name, "X");
    }

    #[test]
    fn suspect_module_uses_first_available_name() {
        let doc = json!({ "suspects": [
            { "module_path": "C:/mods/a.esp", "reason": "top frame" },
            { "inferred_mod_name": "ModC" },
            { "module_filename": "b.dll", "module_path": "ignored" },
        ]});
        let suspects = summary_from_value(&doc).suspects;
        assert_eq!(suspects[0].module, "C:/mods/a.esp");
        assert_eq!(suspects[1].module, "ModC");
        assert_eq!(suspects[2].module, "b.dll");
    }

    #[test]
    fn malformed_suspect_elements_degrade_individually() {
        let doc = json!({ "suspects": [
            "not an object",
            { "confidence": "high", "module_filename": "a.dll", "reason": "r" },
        ]});
        let suspects = summary_from_value(&doc).suspects;
        assert_eq!(suspects.len(), 2);
        assert_eq!(suspects[0], Suspect::default());
        assert_eq!(suspects[1].module, "a.dll");
    }

    #[test]
    fn resource_defaults_and_markers() {
        let doc = json!({ "resources": [
            { "kind": "", "path": "textures/a.dds", "providers": [], "is_conflict": true },
            { "kind": "mesh", "path": "m.nif", "providers": ["ModA", "ModB"], "is_conflict": 0 },
        ]});
        let resources = summary_from_value(&doc).resource_items;
        assert_eq!(resources[0].kind, "resource");
        assert_eq!(resources[0].providers, "-");
        assert_eq!(resources[0].conflict, "conflict");
        assert_eq!(resources[1].providers, "ModA, ModB");
        assert_eq!(resources[1].conflict, "");
    }

    #[test]
    fn history_correlation_count_requires_an_object() {
        let doc = json!({ "history_correlation": { "count": 3 } });
        assert_eq!(summary_from_value(&doc).history_correlation_count, 3);

        let doc = json!({ "history_correlation": 3 });
        assert_eq!(summary_from_value(&doc).history_correlation_count, 0);

        let doc = json!({ "history_correlation": { "count": "3" } });
        assert_eq!(summary_from_value(&doc).history_correlation_count, 0);
    }

    #[test]
    fn troubleshooting_block_is_optional() {
        let doc = json!({});
        let summary = summary_from_value(&doc);
        assert_eq!(summary.troubleshooting_title, "");
        assert!(summary.troubleshooting_steps.is_empty());

        let doc = json!({ "troubleshooting_steps": "wrong type" });
        let summary = summary_from_value(&doc);
        assert_eq!(summary.troubleshooting_title, "");
        assert!(summary.troubleshooting_steps.is_empty());

        let doc = json!({ "troubleshooting_steps": {
            "title": "Verify files",
            "steps": ["run the checker", ""],
        }});
        let summary = summary_from_value(&doc);
        assert_eq!(summary.troubleshooting_title, "Verify files");
        assert_eq!(summary.troubleshooting_steps, vec!["run the checker"]);
    }

    #[test]
    fn empty_document_yields_all_defaults() {
        assert_eq!(summary_from_value(&json!({})), AnalysisSummary::default());
    }
}
