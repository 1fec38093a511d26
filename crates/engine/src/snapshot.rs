use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::NodeSnapshot;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode scene snapshot for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write scene snapshot to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Serialize)]
struct SnapshotFile<'a> {
    tick: u64,
    nodes: &'a [NodeSnapshot],
}

/// Writes `nodes` as pretty JSON. The new file is staged next to `path` and renamed over it,
/// so `path` always holds either the previous snapshot or the complete new one.
pub fn write_snapshot_atomic(
    path: &Path,
    tick: u64,
    nodes: &[NodeSnapshot],
) -> Result<(), SnapshotError> {
    let text = serde_json::to_string_pretty(&SnapshotFile { tick, nodes }).map_err(|source| {
        SnapshotError::Encode {
            path: path.to_path_buf(),
            source,
        }
    })?;
    persist_beside(path, text.as_bytes()).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn persist_beside(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}
