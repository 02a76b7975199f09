//! Whole-file output writes with replace-on-success semantics.
//!
//! Content is written to a temporary file next to the destination, synced,
//! and renamed over it. A failed write leaves the previous file untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::table::RecordTable;
use crate::types::RowIndex;

fn persistence(path: &Path, reason: impl std::fmt::Display) -> CoreError {
    CoreError::Persistence {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// A synced temporary file next to its destination, not yet renamed over it.
///
/// Dropping it without [`StagedFile::commit`] removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub fn destination(&self) -> &Path {
        &self.dest
    }

    /// Rename the temporary file over the destination.
    pub fn commit(mut self) -> Result<(), CoreError> {
        std::fs::rename(&self.tmp, &self.dest).map_err(|e| persistence(&self.dest, e))?;
        self.committed = true;
        if let Some(parent) = self.dest.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.tmp);
        }
    }
}

/// Write `bytes` to a synced temporary file beside `path`, creating parent
/// directories. `path` itself is not touched until the result is committed.
pub fn stage(path: &Path, bytes: &[u8]) -> Result<StagedFile, CoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| persistence(path, "destination has no file name"))?;
    if path.is_dir() {
        return Err(persistence(path, "destination is a directory"));
    }
    std::fs::create_dir_all(parent).map_err(|e| persistence(path, e))?;

    let staged = StagedFile {
        tmp: parent.join(format!(".{file_name}.tmp.{}", std::process::id())),
        dest: path.to_path_buf(),
        committed: false,
    };
    let written = (|| -> std::io::Result<()> {
        let mut f = std::fs::File::create(&staged.tmp)?;
        f.write_all(bytes)?;
        f.sync_all()
    })();
    written.map_err(|e| persistence(path, e))?;
    Ok(staged)
}

/// Atomically replace `path` with `bytes`, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    stage(path, bytes)?.commit()
}

/// Render the selected rows of `table` (raw values plus derived columns).
pub fn render_rows(table: &RecordTable, rows: &[RowIndex]) -> Result<Vec<u8>, CoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.output_headers())?;
    for &row in rows {
        writer.write_record(table.output_row(row))?;
    }
    writer
        .into_inner()
        .map_err(|e| CoreError::Io(e.into_error()))
}

/// Stage the selected rows of `table` as a delimited file at `path`.
pub fn stage_rows(path: &Path, table: &RecordTable, rows: &[RowIndex]) -> Result<StagedFile, CoreError> {
    let bytes = render_rows(table, rows).map_err(|e| persistence(path, e))?;
    let staged = stage(path, &bytes)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "Table staged");
    Ok(staged)
}

/// Atomically write `value` as pretty-printed JSON.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| persistence(path, e))?;
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::table;

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.csv");
        write_atomic(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn failed_write_leaves_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::create_dir(&path).unwrap();
        let err = write_atomic(&path, b"new").unwrap_err();
        assert!(matches!(err, CoreError::Persistence { .. }));
        assert!(path.is_dir());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn dropped_stage_leaves_destination_and_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old").unwrap();
        let staged = stage(&path, b"new").unwrap();
        assert_eq!(staged.destination(), path.as_path());
        drop(staged);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn renders_selected_rows_with_quoting() {
        let t = table(&["uid", "farmer_name"], &[&["U1", "Patil, Asha"], &["U2", "Ravi"]]);
        let bytes = render_rows(&t, &[0]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "uid,farmer_name\nU1,\"Patil, Asha\"\n"
        );
    }
}
