//! Plain-text rendering of a completed analysis.
//!
//! The display caps live here, in the consuming layer: ingestion hands over
//! the full lists and this module decides how much of each is worth a
//! terminal. Event lines are capped from the tail because the newest entries
//! are the ones that explain the incident.

use std::io::{self, Write};

use dump_triage::CompletedAnalysis;

pub const MAX_SUSPECTS: usize = 5;
pub const MAX_RECOMMENDATIONS: usize = 12;
pub const MAX_CALLSTACK_FRAMES: usize = 160;
pub const MAX_EVIDENCE_ITEMS: usize = 80;
pub const MAX_RESOURCE_ITEMS: usize = 120;
pub const MAX_EVENT_LINES: usize = 200;

pub fn print_incident<W: Write>(out: &mut W, analysis: &CompletedAnalysis) -> io::Result<()> {
    let summary = &analysis.summary;

    if summary.summary_sentence.trim().is_empty() {
        writeln!(out, "No summary sentence produced.")?;
    } else {
        writeln!(out, "{}", summary.summary_sentence)?;
    }
    writeln!(out)?;

    writeln!(out, "Crash bucket:  {}", or_unavailable(&summary.crash_bucket_key))?;
    writeln!(out, "Fault module:  {}", or_unavailable(&summary.module_plus_offset))?;
    writeln!(out, "Inferred mod:  {}", or_unavailable(&summary.inferred_mod_name))?;
    if let Some(kind) = classification(summary) {
        writeln!(out, "Incident kind: {}", kind)?;
    }
    if summary.history_correlation_count > 0 {
        writeln!(
            out,
            "Seen before:   correlates with {} earlier incident(s)",
            summary.history_correlation_count
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Suspects")?;
    if summary.suspects.is_empty() {
        writeln!(out, "  (no strong suspect was extracted)")?;
    }
    for suspect in summary.suspects.iter().take(MAX_SUSPECTS) {
        writeln!(
            out,
            "  [{}] {} - {}",
            or_unknown(&suspect.confidence),
            or_unknown(&suspect.module),
            suspect.reason
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Recommendations")?;
    if summary.recommendations.is_empty() {
        writeln!(out, "  (no recommendation text was generated)")?;
    }
    for recommendation in summary.recommendations.iter().take(MAX_RECOMMENDATIONS) {
        writeln!(out, "  - {}", recommendation)?;
    }

    if !summary.troubleshooting_steps.is_empty() {
        writeln!(out)?;
        if summary.troubleshooting_title.is_empty() {
            writeln!(out, "Troubleshooting")?;
        } else {
            writeln!(out, "Troubleshooting: {}", summary.troubleshooting_title)?;
        }
        for (i, step) in summary.troubleshooting_steps.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, step)?;
        }
    }

    if !summary.callstack_frames.is_empty() {
        writeln!(out)?;
        writeln!(out, "Crashing call stack")?;
        for frame in summary.callstack_frames.iter().take(MAX_CALLSTACK_FRAMES) {
            writeln!(out, "  {}", frame)?;
        }
    }

    if !summary.evidence_items.is_empty() {
        writeln!(out)?;
        writeln!(out, "Evidence")?;
        for item in summary.evidence_items.iter().take(MAX_EVIDENCE_ITEMS) {
            writeln!(
                out,
                "  [{}] {}: {}",
                or_unknown(&item.confidence),
                item.title,
                item.details
            )?;
        }
    }

    if !summary.resource_items.is_empty() {
        writeln!(out)?;
        writeln!(out, "Resources")?;
        for item in summary.resource_items.iter().take(MAX_RESOURCE_ITEMS) {
            write!(out, "  {} {} (providers: {})", item.kind, item.path, item.providers)?;
            if item.conflict.is_empty() {
                writeln!(out)?;
            } else {
                writeln!(out, " [{}]", item.conflict)?;
            }
        }
    }

    if !analysis.event_lines.is_empty() {
        writeln!(out)?;
        writeln!(out, "Recent events")?;
        for line in tail(&analysis.event_lines, MAX_EVENT_LINES) {
            writeln!(out, "  {}", line)?;
        }
    }

    if !analysis.wait_chain.is_empty() {
        writeln!(out)?;
        writeln!(out, "Wait chain")?;
        for line in analysis.wait_chain.lines() {
            writeln!(out, "  {}", line)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Artifacts in {}", analysis.out_dir.display())?;
    Ok(())
}

fn classification(summary: &dump_triage::AnalysisSummary) -> Option<&'static str> {
    if summary.is_crash_like {
        Some("crash")
    } else if summary.is_hang_like {
        Some("hang")
    } else if summary.is_manual_capture {
        Some("manual capture")
    } else if summary.is_snapshot_like {
        Some("snapshot")
    } else {
        None
    }
}

fn or_unavailable(value: &str) -> &str {
    if value.trim().is_empty() {
        "unavailable"
    } else {
        value
    }
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "unknown"
    } else {
        value
    }
}

/// The last `cap` entries, in order.
fn tail(lines: &[String], cap: usize) -> &[String] {
    &lines[lines.len().saturating_sub(cap)..]
}
