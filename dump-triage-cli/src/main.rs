use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use dump_triage::{
    ExecutionBridge, HostDiscovery, InvocationRequest, TriageError, TriageSession, EXIT_CANCELED,
};

mod render;

/// Analyze a crash dump with the external analysis engine and print a
/// structured incident summary.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Run as the headless analysis host: invoke the engine in this process,
    /// write the artifacts, and exit with the engine's status code.
    #[arg(long)]
    headless: bool,

    /// Directory for engine artifacts (defaults to the dump's directory).
    #[arg(long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Language hint handed through to the engine.
    #[arg(long)]
    lang: Option<String>,

    /// Ask the engine for verbose diagnostics.
    #[arg(long)]
    debug: bool,

    /// Let the engine consult online symbol servers.
    #[arg(long, conflicts_with = "no_online_symbols")]
    allow_online_symbols: bool,

    /// Forbid online symbol lookup (the default).
    #[arg(long)]
    no_online_symbols: bool,

    /// Analysis host executable to spawn for interactive runs
    /// (defaults to this executable).
    #[arg(long, value_name = "PATH")]
    engine_host: Option<PathBuf>,

    /// The crash dump to analyze.
    dump: PathBuf,
}

impl Args {
    fn request(&self) -> InvocationRequest {
        InvocationRequest {
            dump_path: self.dump.clone(),
            out_dir: self.out_dir.clone(),
            language: self.lang.clone(),
            debug: self.debug,
            allow_online_symbols: self.allow_online_symbols,
            headless: self.headless,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();
    let code = match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    };
    std::process::exit(code);
}

async fn run(args: Args) -> anyhow::Result<i32> {
    if args.headless {
        return run_headless(&args).await;
    }

    let host = match &args.engine_host {
        Some(path) => HostDiscovery::Explicit(path.clone()),
        None => HostDiscovery::Auto,
    };
    let bridge = ExecutionBridge::new().host_discovery(host);
    let session = Arc::new(TriageSession::new(bridge));

    // Ctrl-C cancels the run in flight instead of tearing the process down
    // mid-analysis; the session then reports the reserved cancellation code.
    let interrupt_session = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, canceling analysis");
            interrupt_session.cancel().await;
        }
    });

    match session.analyze(args.request()).await {
        Ok(analysis) => {
            let stdout = std::io::stdout();
            render::print_incident(&mut stdout.lock(), &analysis)
                .context("while writing the incident summary")?;
            Ok(0)
        }
        Err(TriageError::Canceled) => {
            log::warn!("analysis canceled");
            Ok(EXIT_CANCELED)
        }
        Err(TriageError::Engine { exit_code, message }) => {
            log::error!("analysis failed (exit code {}): {}", exit_code, message);
            Ok(exit_code)
        }
        Err(err) => {
            log::error!("{}", err);
            Ok(1)
        }
    }
}

/// The out-of-process host contract: run the engine in this process and make
/// its artifacts the product. Diagnostics go to stderr so the parent's
/// stderr-wins capture sees them.
async fn run_headless(args: &Args) -> anyhow::Result<i32> {
    let bridge = ExecutionBridge::new().host_discovery(HostDiscovery::Disabled);
    let result = bridge.run(&args.request(), &CancellationToken::new()).await;
    if !result.diagnostic.is_empty() {
        eprintln!("{}", result.diagnostic);
    }
    Ok(result.exit_code)
}
