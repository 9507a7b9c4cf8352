//! The direct call contract with the analysis engine.
//!
//! The engine ships as a dynamic library exposing a single C entry point.
//! [`AnalyzerEngine`] is the seam the bridge calls through, so the bridge can
//! be exercised against a scripted engine in tests; [`NativeEngine`] is the
//! production implementation that loads the library and marshals the call.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Exit code for a request that never reached the engine (missing dump,
/// empty dump path).
pub const EXIT_INVALID_INPUT: i32 = 2;
/// Exit code when no invocation strategy can reach the engine.
pub const EXIT_ENGINE_UNAVAILABLE: i32 = 5;
/// Exit code for failures while running the engine, as opposed to outcomes
/// the engine itself reported.
pub const EXIT_EXECUTION_FAILED: i32 = 6;
/// Reserved exit code for caller-initiated cancellation. No other path may
/// produce it, so callers can always tell a cancel apart from a failure.
pub const EXIT_CANCELED: i32 = 1223;

/// File name of the engine library, platform decoration included.
pub fn engine_library_name() -> String {
    format!(
        "{}triage_engine{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

/// Arguments for one engine call.
///
/// The online-symbol policy is an explicit argument rather than an ambient
/// process-wide toggle, so two runs with different policies cannot observe
/// each other.
#[derive(Debug, Clone, Copy)]
pub struct EngineCall<'a> {
    pub dump_path: &'a Path,
    pub out_dir: &'a Path,
    pub language: Option<&'a str>,
    pub debug: bool,
    pub allow_online_symbols: bool,
}

/// What the engine reported for one call: its status code plus whatever it
/// wrote into the caller-provided error buffer.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub code: i32,
    pub diagnostic: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine library is not on disk where we expect it.
    #[error("engine library not found: {0}")]
    LibraryNotFound(String),
    /// The library exists but could not be loaded.
    #[error("failed to load engine library {path}: {source}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    /// The library loaded but does not export the entry point.
    #[error("engine entry point `{0}` not found: {1}")]
    EntryPointMissing(&'static str, #[source] libloading::Error),
    /// The call itself went wrong (bad arguments, engine-side fault).
    #[error("engine call failed: {0}")]
    CallFailed(String),
}

/// The in-process call contract. Implementations must be callable from a
/// blocking worker thread.
pub trait AnalyzerEngine: Send + Sync {
    fn analyze(&self, call: &EngineCall<'_>) -> Result<EngineStatus, EngineError>;
}

const ENTRY_POINT: &str = "triage_analyze_dump";
const ERROR_BUF_LEN: usize = 4096;

/// `triage_analyze_dump(dump, out_dir, lang, debug, allow_online_symbols,
/// err_buf, err_buf_len) -> status`. `lang` may be null; `err_buf` receives a
/// NUL-terminated diagnostic on failure.
type AnalyzeDumpFn = unsafe extern "C" fn(
    *const c_char,
    *const c_char,
    *const c_char,
    c_int,
    c_int,
    *mut c_char,
    c_int,
) -> c_int;

/// Production engine: loads the engine dynamic library for the duration of
/// one call and invokes its entry point.
#[derive(Debug, Default)]
pub struct NativeEngine {
    library_path: Option<PathBuf>,
}

impl NativeEngine {
    pub fn new() -> NativeEngine {
        NativeEngine { library_path: None }
    }

    /// Use a fixed library path instead of searching next to the executable.
    pub fn with_library(path: impl Into<PathBuf>) -> NativeEngine {
        NativeEngine {
            library_path: Some(path.into()),
        }
    }

    /// Look for the engine library next to the current executable, then one
    /// directory up.
    pub fn locate_library() -> Option<PathBuf> {
        let file_name = engine_library_name();
        let exe = std::env::current_exe().ok()?;
        let exe_dir = exe.parent()?;
        let candidates = [exe_dir.join(&file_name), exe_dir.join("..").join(&file_name)];
        candidates.iter().find(|c| c.is_file()).cloned()
    }

    fn resolve_library(&self) -> Result<PathBuf, EngineError> {
        match &self.library_path {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(EngineError::LibraryNotFound(path.display().to_string())),
            None => {
                Self::locate_library().ok_or_else(|| EngineError::LibraryNotFound(engine_library_name()))
            }
        }
    }
}

impl AnalyzerEngine for NativeEngine {
    fn analyze(&self, call: &EngineCall<'_>) -> Result<EngineStatus, EngineError> {
        let path = self.resolve_library()?;
        debug!("loading engine library from {}", path.display());

        // Safety: the library is the engine we ship with; it stays loaded
        // for the duration of the call below.
        let library = unsafe { libloading::Library::new(&path) }.map_err(|source| {
            EngineError::LibraryLoad {
                path: path.clone(),
                source,
            }
        })?;
        let entry: libloading::Symbol<AnalyzeDumpFn> =
            unsafe { library.get(b"triage_analyze_dump\0") }
                .map_err(|e| EngineError::EntryPointMissing(ENTRY_POINT, e))?;

        let dump = path_arg(call.dump_path)?;
        let out_dir = path_arg(call.out_dir)?;
        let language = match call.language {
            Some(lang) => Some(
                CString::new(lang)
                    .map_err(|_| EngineError::CallFailed("language hint contains a NUL byte".into()))?,
            ),
            None => None,
        };

        let mut err_buf = vec![0u8; ERROR_BUF_LEN];
        // Safety: all pointers are valid for the duration of the call and
        // err_buf is writable for the length we pass.
        let code = unsafe {
            entry(
                dump.as_ptr(),
                out_dir.as_ptr(),
                language.as_ref().map_or(std::ptr::null(), |l| l.as_ptr()),
                call.debug as c_int,
                call.allow_online_symbols as c_int,
                err_buf.as_mut_ptr() as *mut c_char,
                err_buf.len() as c_int,
            )
        };

        let end = err_buf.iter().position(|&b| b == 0).unwrap_or(err_buf.len());
        let diagnostic = String::from_utf8_lossy(&err_buf[..end]).trim().to_string();
        Ok(EngineStatus {
            code: code as i32,
            diagnostic,
        })
    }
}

fn path_arg(path: &Path) -> Result<CString, EngineError> {
    CString::new(path.to_string_lossy().into_owned())
        .map_err(|_| EngineError::CallFailed(format!("path contains a NUL byte: {}", path.display())))
}
