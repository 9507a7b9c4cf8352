//! Decides how to invoke the analysis engine and normalizes the outcome.
//!
//! Two strategies exist: spawning the headless analysis host executable
//! (out-of-process) and calling the engine library directly (in-process).
//! Selection and fallback live in [`ExecutionBridge`]; the strategies only
//! run. Every failure mode, from a missing dump file to a killed host
//! process, converges on an [`ExecutionResult`] so callers have exactly one
//! contract to check. The single outcome callers must distinguish is the
//! reserved cancellation code, [`EXIT_CANCELED`].

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::artifacts;
use crate::engine::{
    AnalyzerEngine, EngineCall, EngineError, NativeEngine, EXIT_CANCELED, EXIT_ENGINE_UNAVAILABLE,
    EXIT_EXECUTION_FAILED, EXIT_INVALID_INPUT,
};
use crate::request::InvocationRequest;

/// Normalized outcome of one engine invocation, whichever strategy ran.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Engine diagnostics, possibly empty. For the out-of-process strategy
    /// this is standard error if non-blank, else standard output.
    pub diagnostic: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn canceled(&self) -> bool {
        self.exit_code == EXIT_CANCELED
    }

    fn new(exit_code: i32, diagnostic: impl Into<String>) -> ExecutionResult {
        ExecutionResult {
            exit_code,
            diagnostic: diagnostic.into(),
        }
    }

    fn canceled_now() -> ExecutionResult {
        ExecutionResult::new(EXIT_CANCELED, "analysis canceled")
    }
}

/// A fully resolved request: paths validated and the output directory
/// settled. This is what the strategies actually run.
#[derive(Debug, Clone)]
pub struct InvocationPlan {
    pub dump_path: PathBuf,
    pub out_dir: PathBuf,
    pub language: Option<String>,
    pub debug: bool,
    pub allow_online_symbols: bool,
}

/// One way of reaching the engine.
#[async_trait]
pub trait ExecutionStrategy {
    async fn run(&self, plan: &InvocationPlan, cancel: &CancellationToken) -> ExecutionResult;
}

/// How the bridge finds the out-of-process host executable.
#[derive(Debug, Clone)]
pub enum HostDiscovery {
    /// The current executable, else a `dump-triage` binary next to it.
    Auto,
    /// A fixed host path. Used by embedders and tests.
    Explicit(PathBuf),
    /// Never spawn a host. The headless host process itself runs with this
    /// so a run cannot re-spawn its own executable.
    Disabled,
}

impl Default for HostDiscovery {
    fn default() -> HostDiscovery {
        HostDiscovery::Auto
    }
}

pub struct ExecutionBridge {
    engine: Arc<dyn AnalyzerEngine>,
    host: HostDiscovery,
}

impl Default for ExecutionBridge {
    fn default() -> ExecutionBridge {
        ExecutionBridge::new()
    }
}

impl ExecutionBridge {
    pub fn new() -> ExecutionBridge {
        ExecutionBridge::with_engine(Arc::new(NativeEngine::new()))
    }

    pub fn with_engine(engine: Arc<dyn AnalyzerEngine>) -> ExecutionBridge {
        ExecutionBridge {
            engine,
            host: HostDiscovery::default(),
        }
    }

    pub fn host_discovery(mut self, host: HostDiscovery) -> ExecutionBridge {
        self.host = host;
        self
    }

    /// Run one analysis. This never fails as such: every failure mode is
    /// folded into the returned exit code and message.
    ///
    /// Interactive requests prefer the out-of-process host; if its binary
    /// cannot be located the bridge falls back to the in-process call and
    /// the caller never needs to know which strategy ran.
    pub async fn run(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        if request.dump_path.as_os_str().is_empty() {
            return ExecutionResult::new(EXIT_INVALID_INPUT, "dump path is empty");
        }
        let dump_path = match std::fs::canonicalize(&request.dump_path) {
            Ok(path) if path.is_file() => path,
            _ => {
                return ExecutionResult::new(
                    EXIT_INVALID_INPUT,
                    format!("dump file not found: {}", request.dump_path.display()),
                )
            }
        };

        let mut out_dir = artifacts::resolve_output_dir(&dump_path, request.out_dir.as_deref());
        if out_dir.is_relative() {
            // The host runs with its own working directory, so a relative
            // output directory must be pinned down before we hand it over.
            if let Ok(cwd) = std::env::current_dir() {
                out_dir = cwd.join(&out_dir);
            }
        }
        if let Err(e) = std::fs::create_dir_all(&out_dir) {
            return ExecutionResult::new(
                EXIT_EXECUTION_FAILED,
                format!("failed to create output directory {}: {}", out_dir.display(), e),
            );
        }

        if cancel.is_cancelled() {
            return ExecutionResult::canceled_now();
        }

        let plan = InvocationPlan {
            dump_path,
            out_dir,
            language: request.language.clone(),
            debug: request.debug,
            allow_online_symbols: request.allow_online_symbols,
        };

        let host = self.locate_host();
        if !request.headless || host.is_some() {
            if let Some(host) = host {
                return OutOfProcessHost { host }.run(&plan, cancel).await;
            }
            debug!("analysis host executable not found, using the in-process engine");
        }
        InProcessCall {
            engine: self.engine.clone(),
        }
        .run(&plan, cancel)
        .await
    }

    fn locate_host(&self) -> Option<PathBuf> {
        match &self.host {
            HostDiscovery::Disabled => None,
            HostDiscovery::Explicit(path) => {
                if path.is_file() {
                    Some(path.clone())
                } else {
                    None
                }
            }
            HostDiscovery::Auto => {
                if let Ok(exe) = std::env::current_exe() {
                    if exe.is_file() {
                        return Some(exe);
                    }
                    let sibling = exe
                        .parent()?
                        .join(format!("dump-triage{}", std::env::consts::EXE_SUFFIX));
                    if sibling.is_file() {
                        return Some(sibling);
                    }
                }
                None
            }
        }
    }
}

/// Spawns the headless host executable with an argument set equivalent to
/// the in-process call, captures its streams, and kills it on cancellation.
pub struct OutOfProcessHost {
    pub host: PathBuf,
}

#[async_trait]
impl ExecutionStrategy for OutOfProcessHost {
    async fn run(&self, plan: &InvocationPlan, cancel: &CancellationToken) -> ExecutionResult {
        let mut command = Command::new(&self.host);
        command
            .arg("--headless")
            .arg("--out-dir")
            .arg(&plan.out_dir);
        if let Some(lang) = &plan.language {
            command.arg("--lang").arg(lang);
        }
        if plan.debug {
            command.arg("--debug");
        }
        command.arg(if plan.allow_online_symbols {
            "--allow-online-symbols"
        } else {
            "--no-online-symbols"
        });
        command.arg(&plan.dump_path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.host.parent() {
            if !dir.as_os_str().is_empty() {
                command.current_dir(dir);
            }
        }
        #[cfg(windows)]
        {
            // CREATE_NO_WINDOW, so the host never flashes a console.
            command.creation_flags(0x0800_0000);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::new(
                    EXIT_EXECUTION_FAILED,
                    format!("failed to start analysis host {}: {}", self.host.display(), e),
                )
            }
        };

        // Drain both pipes on their own tasks from the start: a full pipe
        // must never be able to block process teardown.
        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let wait_outcome = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match wait_outcome {
            Some(status) => status,
            None => {
                // Canceled mid-run: kill the host (unless it just exited on
                // its own), then drain everything before reporting back so
                // no reader outlives this call.
                if !matches!(child.try_wait(), Ok(Some(_))) {
                    if let Err(e) = child.kill().await {
                        warn!("failed to kill analysis host on cancel: {}", e);
                    }
                }
                let _ = child.wait().await;
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                return ExecutionResult::canceled_now();
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        match status {
            Ok(status) => {
                let stderr = stderr.trim();
                let stdout = stdout.trim();
                let message = if !stderr.is_empty() { stderr } else { stdout };
                match status.code() {
                    Some(code) => ExecutionResult::new(code, message),
                    None => ExecutionResult::new(
                        EXIT_EXECUTION_FAILED,
                        if message.is_empty() {
                            "analysis host terminated by a signal"
                        } else {
                            message
                        },
                    ),
                }
            }
            Err(e) => ExecutionResult::new(
                EXIT_EXECUTION_FAILED,
                format!("failed to wait for analysis host: {}", e),
            ),
        }
    }
}

async fn read_stream<R>(stream: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Calls the engine entry point on a blocking worker so the caller's thread
/// is never blocked. This path has no mid-flight cancellation; the token is
/// only consulted before the call starts.
pub struct InProcessCall {
    pub engine: Arc<dyn AnalyzerEngine>,
}

#[async_trait]
impl ExecutionStrategy for InProcessCall {
    async fn run(&self, plan: &InvocationPlan, cancel: &CancellationToken) -> ExecutionResult {
        if cancel.is_cancelled() {
            return ExecutionResult::canceled_now();
        }
        let engine = self.engine.clone();
        let call_plan = plan.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            engine.analyze(&EngineCall {
                dump_path: &call_plan.dump_path,
                out_dir: &call_plan.out_dir,
                language: call_plan.language.as_deref(),
                debug: call_plan.debug,
                allow_online_symbols: call_plan.allow_online_symbols,
            })
        })
        .await;

        match outcome {
            Ok(Ok(status)) => ExecutionResult::new(status.code, status.diagnostic),
            Ok(Err(e)) => match e {
                EngineError::LibraryNotFound(_)
                | EngineError::LibraryLoad { .. }
                | EngineError::EntryPointMissing(..) => {
                    ExecutionResult::new(EXIT_ENGINE_UNAVAILABLE, e.to_string())
                }
                EngineError::CallFailed(_) => failure_with_side_log(plan, &e.to_string()),
            },
            Err(join_error) => {
                failure_with_side_log(plan, &format!("engine call panicked: {}", join_error))
            }
        }
    }
}

/// Record an unexpected in-process failure next to the other artifacts. The
/// log write is best-effort only; the primary failure is reported either way.
fn failure_with_side_log(plan: &InvocationPlan, details: &str) -> ExecutionResult {
    let log_path = artifacts::engine_error_log_path(&plan.dump_path, &plan.out_dir);
    let mut message = details.to_string();
    match std::fs::write(&log_path, details) {
        Ok(()) => {
            message.push_str("\nlog: ");
            message.push_str(&log_path.display().to_string());
        }
        Err(e) => debug!("failed to write engine error log {}: {}", log_path.display(), e),
    }
    ExecutionResult::new(EXIT_EXECUTION_FAILED, message)
}
