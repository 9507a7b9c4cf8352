use std::path::PathBuf;

/// Normalized parameters for one analysis run.
///
/// The bridge validates `dump_path` before any strategy runs; every other
/// field has a usable default.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// The crash dump to analyze. Must resolve to an existing file.
    pub dump_path: PathBuf,
    /// Where the engine writes its artifacts. Defaults to the dump's parent
    /// directory when unset.
    pub out_dir: Option<PathBuf>,
    /// Short language code handed through to the engine ("en", "ko", ...).
    pub language: Option<String>,
    /// Ask the engine for verbose diagnostics.
    pub debug: bool,
    /// Whether the engine may consult online symbol servers.
    pub allow_online_symbols: bool,
    /// Marks the run as non-interactive.
    pub headless: bool,
}

impl InvocationRequest {
    pub fn new(dump_path: impl Into<PathBuf>) -> InvocationRequest {
        InvocationRequest {
            dump_path: dump_path.into(),
            out_dir: None,
            language: None,
            debug: false,
            allow_online_symbols: false,
            headless: false,
        }
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> InvocationRequest {
        self.out_dir = Some(out_dir.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> InvocationRequest {
        self.language = Some(language.into());
        self
    }

    pub fn headless(mut self, headless: bool) -> InvocationRequest {
        self.headless = headless;
        self
    }
}
