//! One analysis run at a time.
//!
//! A [`TriageSession`] owns the currently running analysis. Starting a new
//! run cancels the previous one and waits for it to fully terminate before
//! the new engine invocation starts, so two runs never execute concurrently
//! against the same session. The stored display model is swapped wholesale:
//! the old value stays visible until the new one is fully constructed.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::artifacts;
use crate::bridge::ExecutionBridge;
use crate::ingest::{self, IngestError};
use crate::request::InvocationRequest;
use crate::summary::AnalysisSummary;

/// A finished run: the parsed display model plus its sibling artifacts.
#[derive(Debug, Clone)]
pub struct CompletedAnalysis {
    pub summary: AnalysisSummary,
    /// Free-text report, empty when the engine produced none.
    pub report_text: String,
    /// Event log lines, oldest first and uncapped; display layers take the
    /// tail they want.
    pub event_lines: Vec<String>,
    /// Wait-chain snapshot, pretty-printed when possible.
    pub wait_chain: String,
    pub out_dir: PathBuf,
    pub summary_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// The caller (or a superseding run) canceled this analysis.
    #[error("analysis canceled")]
    Canceled,
    /// The run failed before or inside the engine; `exit_code` is the
    /// bridge's normalized code.
    #[error("analysis failed with exit code {exit_code}: {message}")]
    Engine { exit_code: i32, message: String },
    /// The engine reported success but never wrote the summary document.
    #[error("analysis succeeded but the summary document is missing: {}", .0.display())]
    SummaryMissing(PathBuf),
    /// The summary document exists but could not be opened or parsed.
    #[error(transparent)]
    Summary(#[from] IngestError),
}

struct RunHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

pub struct TriageSession {
    bridge: Arc<ExecutionBridge>,
    current: Mutex<Option<RunHandle>>,
    latest: StdMutex<Option<Arc<CompletedAnalysis>>>,
}

impl TriageSession {
    pub fn new(bridge: ExecutionBridge) -> TriageSession {
        TriageSession {
            bridge: Arc::new(bridge),
            current: Mutex::new(None),
            latest: StdMutex::new(None),
        }
    }

    /// Run one analysis to completion and ingest its artifacts.
    ///
    /// Any run still in flight is canceled and awaited first. If this run is
    /// itself superseded before it finishes, it resolves to
    /// [`TriageError::Canceled`].
    pub async fn analyze(
        &self,
        request: InvocationRequest,
    ) -> Result<Arc<CompletedAnalysis>, TriageError> {
        let cancel = CancellationToken::new();
        let (result_tx, result_rx) = oneshot::channel();
        {
            let mut current = self.current.lock().await;
            if let Some(previous) = current.take() {
                previous.cancel.cancel();
                let _ = previous.task.await;
            }

            let bridge = self.bridge.clone();
            let run_request = request.clone();
            let run_cancel = cancel.clone();
            let task = tokio::spawn(async move {
                let result = bridge.run(&run_request, &run_cancel).await;
                let _ = result_tx.send(result);
            });
            *current = Some(RunHandle {
                cancel: cancel.clone(),
                task,
            });
        }

        let result = match result_rx.await {
            Ok(result) => result,
            Err(_) => return Err(TriageError::Canceled),
        };
        if result.canceled() {
            return Err(TriageError::Canceled);
        }
        if !result.success() {
            return Err(TriageError::Engine {
                exit_code: result.exit_code,
                message: result.diagnostic,
            });
        }

        let dump_path =
            std::fs::canonicalize(&request.dump_path).unwrap_or_else(|_| request.dump_path.clone());
        let out_dir = artifacts::resolve_output_dir(&dump_path, request.out_dir.as_deref());
        let summary_path = artifacts::summary_path(&dump_path, &out_dir);
        if !summary_path.is_file() {
            return Err(TriageError::SummaryMissing(summary_path));
        }

        let summary = ingest::load_summary(&summary_path)?;
        let completed = Arc::new(CompletedAnalysis {
            summary,
            report_text: ingest::load_report_text(&artifacts::report_path(&dump_path, &out_dir)),
            event_lines: ingest::load_event_lines(&artifacts::event_log_path(&dump_path, &out_dir)),
            wait_chain: ingest::load_wait_chain(&artifacts::wait_chain_path(&dump_path, &out_dir)),
            out_dir,
            summary_path,
        });
        *self.latest.lock().unwrap() = Some(completed.clone());
        Ok(completed)
    }

    /// Cancel the run currently in flight, if any. Does not wait for it.
    pub async fn cancel(&self) {
        if let Some(handle) = self.current.lock().await.as_ref() {
            handle.cancel.cancel();
        }
    }

    /// The most recently completed analysis, if any run has succeeded yet.
    pub fn latest(&self) -> Option<Arc<CompletedAnalysis>> {
        self.latest.lock().unwrap().clone()
    }
}
