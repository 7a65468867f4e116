//! Snapshot file I/O: load-or-fresh and atomic write (temp sibling file
//! + rename is the commit point).

use agentworld_core::{Result, Snapshot};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

/// Load a snapshot from `path`. Returns `Snapshot::fresh()` if the file is
/// absent or contains malformed JSON ("the store logs a warning and
/// resets to the fresh shape; this is the only case where state is
/// discarded without an explicit caller request").
pub fn load_or_fresh(path: &Path) -> Snapshot {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Snapshot>(&contents) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "malformed snapshot, resetting to fresh shape");
                Snapshot::fresh()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Snapshot::fresh(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable snapshot, resetting to fresh shape");
            Snapshot::fresh()
        }
    }
}

/// Atomically persist `snapshot` to `path`: write a sibling temp file named
/// `<path>.<pid>.<tsMs>.tmp`, then rename over the target. Returns the
/// individual stringify/write/rename phase durations in milliseconds.
pub fn write_atomic(path: &Path, snapshot: &Snapshot) -> Result<(f64, f64, f64)> {
    let stringify_start = std::time::Instant::now();
    let json = serde_json::to_string(snapshot)?;
    let stringify_ms = stringify_start.elapsed().as_secs_f64() * 1000.0;

    let now_ms = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis())
    .unwrap_or(0);
    let mut tmp_os = path.as_os_str().to_os_string();
    tmp_os.push(format!(".{}.{now_ms}.tmp", process::id()));
    let tmp_path = std::path::PathBuf::from(tmp_os);

    let write_start = std::time::Instant::now();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    let write_ms = write_start.elapsed().as_secs_f64() * 1000.0;

    let rename_start = std::time::Instant::now();
    fs::rename(&tmp_path, path)?;
    let rename_ms = rename_start.elapsed().as_secs_f64() * 1000.0;

    Ok((stringify_ms, write_ms, rename_ms))
}
