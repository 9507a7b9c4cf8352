//! Session orchestration against engines that script the artifact side
//! effects. Supersession of a live host process is exercised in the CLI
//! crate, where a real hangable host binary exists.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;

use dump_triage::{
    artifacts, AnalyzerEngine, EngineCall, EngineError, EngineStatus, ExecutionBridge,
    HostDiscovery, InvocationRequest, TriageError, TriageSession,
};

/// An engine that writes a summary document (and optionally siblings) the
/// way the real engine would, then reports success.
struct WritingEngine {
    doc: serde_json::Value,
    write_siblings: bool,
}

impl AnalyzerEngine for WritingEngine {
    fn analyze(&self, call: &EngineCall<'_>) -> Result<EngineStatus, EngineError> {
        let summary_path = artifacts::summary_path(call.dump_path, call.out_dir);
        std::fs::write(&summary_path, self.doc.to_string())
            .map_err(|e| EngineError::CallFailed(e.to_string()))?;
        if self.write_siblings {
            std::fs::write(
                artifacts::report_path(call.dump_path, call.out_dir),
                "long form report\n",
            )
            .map_err(|e| EngineError::CallFailed(e.to_string()))?;
            std::fs::write(
                artifacts::event_log_path(call.dump_path, call.out_dir),
                "{\"t_ms\":1,\"type\":\"load\"}\n{\"t_ms\":2,\"type\":\"crash\"}\n",
            )
            .map_err(|e| EngineError::CallFailed(e.to_string()))?;
            std::fs::write(
                artifacts::wait_chain_path(call.dump_path, call.out_dir),
                "{\"threads\":[]}",
            )
            .map_err(|e| EngineError::CallFailed(e.to_string()))?;
        }
        Ok(EngineStatus {
            code: 0,
            diagnostic: String::new(),
        })
    }
}

/// Reports success without producing any artifact.
struct SilentEngine;

impl AnalyzerEngine for SilentEngine {
    fn analyze(&self, _call: &EngineCall<'_>) -> Result<EngineStatus, EngineError> {
        Ok(EngineStatus {
            code: 0,
            diagnostic: String::new(),
        })
    }
}

fn write_dump(dir: &Path) -> std::path::PathBuf {
    let dump = dir.join("crash.dmp");
    std::fs::write(&dump, b"MDMP synthetic dump").unwrap();
    dump
}

fn session_with(engine: impl AnalyzerEngine + 'static) -> TriageSession {
    TriageSession::new(
        ExecutionBridge::with_engine(Arc::new(engine)).host_discovery(HostDiscovery::Disabled),
    )
}

#[tokio::test]
async fn analyze_ingests_summary_and_siblings() {
    let dir = tempdir().unwrap();
    let dump = write_dump(dir.path());
    let session = session_with(WritingEngine {
        doc: json!({ "summary_sentence": "null pointer in ModA" }),
        write_siblings: true,
    });

    let analysis = session
        .analyze(InvocationRequest::new(&dump).headless(true))
        .await
        .unwrap();

    assert_eq!(analysis.summary.summary_sentence, "null pointer in ModA");
    assert_eq!(analysis.report_text, "long form report\n");
    assert_eq!(analysis.event_lines.len(), 2);
    assert!(analysis.wait_chain.contains("threads"));
    assert!(analysis.summary_path.is_file());
    assert!(session.latest().is_some());
}

#[tokio::test]
async fn analyze_without_siblings_degrades_to_empty() {
    let dir = tempdir().unwrap();
    let dump = write_dump(dir.path());
    let session = session_with(WritingEngine {
        doc: json!({}),
        write_siblings: false,
    });

    let analysis = session
        .analyze(InvocationRequest::new(&dump).headless(true))
        .await
        .unwrap();

    assert_eq!(analysis.report_text, "");
    assert!(analysis.event_lines.is_empty());
    assert_eq!(analysis.wait_chain, "");
}

#[tokio::test]
async fn successful_run_without_summary_is_a_missing_artifact() {
    let dir = tempdir().unwrap();
    let dump = write_dump(dir.path());
    let session = session_with(SilentEngine);

    let err = session
        .analyze(InvocationRequest::new(&dump).headless(true))
        .await
        .unwrap_err();

    match err {
        TriageError::SummaryMissing(path) => {
            assert!(path.to_string_lossy().contains("_TriageSummary.json"))
        }
        other => panic!("expected SummaryMissing, got {:?}", other),
    }
}

#[tokio::test]
async fn engine_failure_surfaces_exit_code_and_message() {
    let dir = tempdir().unwrap();
    let session = session_with(SilentEngine);

    let err = session
        .analyze(InvocationRequest::new(dir.path().join("missing.dmp")).headless(true))
        .await
        .unwrap_err();

    match err {
        TriageError::Engine { exit_code, message } => {
            assert_eq!(exit_code, dump_triage::EXIT_INVALID_INPUT);
            assert!(message.contains("dump file not found"));
        }
        other => panic!("expected Engine, got {:?}", other),
    }
}

#[tokio::test]
async fn unreadable_summary_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let dump = write_dump(dir.path());

    struct BrokenWriter;
    impl AnalyzerEngine for BrokenWriter {
        fn analyze(&self, call: &EngineCall<'_>) -> Result<EngineStatus, EngineError> {
            std::fs::write(artifacts::summary_path(call.dump_path, call.out_dir), "{ nope")
                .map_err(|e| EngineError::CallFailed(e.to_string()))?;
            Ok(EngineStatus {
                code: 0,
                diagnostic: String::new(),
            })
        }
    }

    let session = session_with(BrokenWriter);
    let err = session
        .analyze(InvocationRequest::new(&dump).headless(true))
        .await
        .unwrap_err();
    assert!(matches!(err, TriageError::Summary(_)));
}

#[tokio::test]
async fn latest_is_replaced_wholesale() {
    let dir = tempdir().unwrap();
    let dump = write_dump(dir.path());

    /// Writes whatever sentence the test currently scripts.
    struct ScriptedWriter(Arc<std::sync::Mutex<String>>);
    impl AnalyzerEngine for ScriptedWriter {
        fn analyze(&self, call: &EngineCall<'_>) -> Result<EngineStatus, EngineError> {
            let sentence = self.0.lock().unwrap().clone();
            let doc = json!({ "summary_sentence": sentence });
            std::fs::write(
                artifacts::summary_path(call.dump_path, call.out_dir),
                doc.to_string(),
            )
            .map_err(|e| EngineError::CallFailed(e.to_string()))?;
            Ok(EngineStatus {
                code: 0,
                diagnostic: String::new(),
            })
        }
    }

    let sentence = Arc::new(std::sync::Mutex::new("first".to_string()));
    let session = session_with(ScriptedWriter(sentence.clone()));

    session
        .analyze(InvocationRequest::new(&dump).headless(true))
        .await
        .unwrap();
    assert_eq!(session.latest().unwrap().summary.summary_sentence, "first");

    *sentence.lock().unwrap() = "second".to_string();
    session
        .analyze(InvocationRequest::new(&dump).headless(true))
        .await
        .unwrap();
    assert_eq!(session.latest().unwrap().summary.summary_sentence, "second");
}
