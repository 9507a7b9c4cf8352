//! A fake analysis host for integration tests.
//!
//! Speaks the out-of-process host contract (`--headless --out-dir <dir>
//! [--lang <code>] [--debug] (--allow-online-symbols | --no-online-symbols)
//! <dump>`) and writes a canned set of artifacts. Tests steer it through an
//! optional `<dump>.stub.json` file next to the dump, so parallel tests
//! never share state:
//!
//! ```json
//! { "hang_ms": 30000, "exit_code": 7, "stderr": "boom",
//!   "stdout": "", "skip_summary": false, "summary": { ... } }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};

use dump_triage::artifacts;

fn main() {
    let mut out_dir: Option<PathBuf> = None;
    let mut dump: Option<PathBuf> = None;

    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        let text = arg.to_string_lossy().into_owned();
        match text.as_str() {
            "--out-dir" => out_dir = args.next().map(PathBuf::from),
            "--lang" => {
                let _ = args.next();
            }
            "--headless" | "--debug" | "--allow-online-symbols" | "--no-online-symbols" => {}
            _ if !text.starts_with('-') => dump = Some(PathBuf::from(arg)),
            _ => {}
        }
    }

    let dump = match dump {
        Some(dump) => dump,
        None => {
            eprintln!("stub-engine: no dump path given");
            std::process::exit(2);
        }
    };
    let out_dir = out_dir.unwrap_or_else(|| {
        artifacts::resolve_output_dir(&dump, None)
    });

    let script = load_script(&dump);

    if let Some(ms) = field_u64(&script, "hang_ms") {
        std::thread::sleep(Duration::from_millis(ms));
    }

    if !field_bool(&script, "skip_summary") {
        let summary = script
            .as_ref()
            .and_then(|s| s.get("summary").cloned())
            .unwrap_or_else(canned_summary);
        write_or_die(
            artifacts::summary_path(&dump, &out_dir),
            summary.to_string().as_bytes(),
        );
        write_or_die(
            artifacts::report_path(&dump, &out_dir),
            b"stub engine long form report\n",
        );
        write_or_die(
            artifacts::event_log_path(&dump, &out_dir),
            b"{\"t_ms\":10,\"type\":\"load\",\"a\":\"ModA\"}\n{\"t_ms\":99,\"type\":\"crash\"}\n",
        );
        write_or_die(
            artifacts::wait_chain_path(&dump, &out_dir),
            b"{\"threads\":[{\"tid\":1,\"blocked_on\":2}]}",
        );
    }

    if let Some(text) = field_str(&script, "stdout") {
        println!("{}", text);
    }
    if let Some(text) = field_str(&script, "stderr") {
        eprintln!("{}", text);
    }

    let code = field_u64(&script, "exit_code").unwrap_or(0) as i32;
    std::process::exit(code);
}

fn load_script(dump: &std::path::Path) -> Option<Value> {
    let mut name = dump.file_name()?.to_os_string();
    name.push(".stub.json");
    let path = dump.with_file_name(name);
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

fn field_u64(script: &Option<Value>, name: &str) -> Option<u64> {
    script.as_ref()?.get(name)?.as_u64()
}

fn field_bool(script: &Option<Value>, name: &str) -> bool {
    script
        .as_ref()
        .and_then(|s| s.get(name))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn field_str(script: &Option<Value>, name: &str) -> Option<String> {
    let text = script.as_ref()?.get(name)?.as_str()?;
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn canned_summary() -> Value {
    json!({
        "summary_sentence": "null pointer in ModA",
        "crash_bucket_key": "av-read:moda.dll+0x1a2b",
        "exception": {
            "module_plus_offset": "moda.dll+0x1a2b",
            "inferred_mod_name": "ModA",
        },
        "analysis": { "is_crash_like": true },
        "suspects": [
            { "confidence": "high", "module_filename": "moda.dll", "reason": "faulting frame" },
        ],
        "recommendations": ["update ModA", "verify load order"],
        "callstack": { "frames": ["moda.dll+0x1a2b", "host.exe+0x99"] },
        "evidence": [
            { "confidence": "medium", "title": "unloaded module", "details": "modb.dll left early" },
        ],
        "resources": [
            { "kind": "texture", "path": "a.dds", "providers": ["ModA", "ModB"], "is_conflict": true },
        ],
        "history_correlation": { "count": 1 },
    })
}

fn write_or_die(path: PathBuf, contents: &[u8]) {
    if let Err(e) = std::fs::write(&path, contents) {
        eprintln!("stub-engine: failed to write {}: {}", path.display(), e);
        std::process::exit(6);
    }
}
