//! Scoped atomic file replacement
//!
//! Writers go to a temporary file in the destination directory, which is
//! flushed, synced and renamed over the final path. A reader of the final
//! path observes either the previous complete file or the new one. On any
//! failure the temporary file is removed when it is dropped.

use crate::error::ModelError;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Atomically replace `path` with `bytes`
///
/// # Errors
/// `ModelError::Io` / `ModelError::NotFound` if the directory is missing or
/// any write, sync or rename step fails
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ModelError> {
    write_atomic_with(path, |w| w.write_all(bytes))
}

/// Atomically replace `path` with whatever `write` produces
///
/// The callback receives a buffered writer over the temporary file. If it
/// returns an error the destination is left untouched.
///
/// # Errors
/// See [`write_atomic`]
pub fn write_atomic_with<F>(path: &Path, write: F) -> Result<(), ModelError>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".tensure-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ModelError::io(dir, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        if let Err(e) = write(&mut writer).and_then(|()| writer.flush()) {
            tracing::debug!(path = %path.display(), error = %e, "atomic write aborted");
            return Err(ModelError::io(path, e));
        }
    }

    tmp.as_file()
        .sync_all()
        .map_err(|e| ModelError::io(path, e))?;

    tmp.persist(path)
        .map_err(|e| ModelError::io(path, e.error))?;

    Ok(())
}

/// Read a whole file, mapping a missing file to `ModelError::NotFound`
///
/// # Errors
/// `ModelError::NotFound` or `ModelError::Io`
pub fn read_file(path: &Path) -> Result<Vec<u8>, ModelError> {
    std::fs::read(path).map_err(|e| ModelError::io(path, e))
}
