//! The display model produced from one analysis run.
//!
//! Every field has a zero-value default. Ingestion degrades missing or
//! malformed source data to these defaults instead of failing, so a summary
//! in hand is always safe to render. The model is a plain value: it is built
//! once per run and replaced wholesale by the next run, never mutated.

/// One suspected culprit, in engine-reported order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suspect {
    pub confidence: String,
    /// Display name of the implicated module.
    pub module: String,
    pub reason: String,
}

/// One piece of supporting evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceItem {
    pub confidence: String,
    pub title: String,
    pub details: String,
}

/// One resource the engine flagged (a file, an override, a loose asset).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceItem {
    pub kind: String,
    pub path: String,
    /// Comma-joined provider list, or `-` when no provider is known.
    pub providers: String,
    /// `conflict` when the engine flagged the resource, else empty.
    pub conflict: String,
}

/// The full incident summary shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub summary_sentence: String,
    pub crash_bucket_key: String,
    /// The faulting location as `module+offset`.
    pub module_plus_offset: String,
    /// Engine-inferred mod name, falling back to the first suspect's module.
    pub inferred_mod_name: String,
    pub is_crash_like: bool,
    pub is_hang_like: bool,
    pub is_snapshot_like: bool,
    pub is_manual_capture: bool,
    pub suspects: Vec<Suspect>,
    pub recommendations: Vec<String>,
    pub callstack_frames: Vec<String>,
    pub evidence_items: Vec<EvidenceItem>,
    pub resource_items: Vec<ResourceItem>,
    /// How many earlier incidents correlate with this one.
    pub history_correlation_count: i64,
    pub troubleshooting_title: String,
    pub troubleshooting_steps: Vec<String>,
}
