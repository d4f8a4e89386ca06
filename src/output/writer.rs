//! Idempotent, atomic persistence of rendered pages

use crate::output::document::strip_capture_timestamp;
use crate::output::RunManifest;
use crate::WriteError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// What a write did to the file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    /// The file already held the same body; it was left untouched
    Unchanged,
}

/// Writes documents under an output root
#[derive(Debug, Clone)]
pub struct Writer {
    root: PathBuf,
}

impl Writer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the output root if needed and checks that it is a writable directory
    ///
    /// # Returns
    ///
    /// `WriteError::OutputRoot` when the root is not a directory or a
    /// temporary file cannot be created in it
    pub fn prepare_root(&self) -> Result<(), WriteError> {
        let root_name = self.root.display().to_string();
        if self.root.exists() {
            let meta =
                fs::metadata(&self.root).map_err(|e| WriteError::OutputRoot(format!("{}: {}", root_name, e)))?;
            if !meta.is_dir() {
                return Err(WriteError::OutputRoot(root_name));
            }
        } else {
            fs::create_dir_all(&self.root)
                .map_err(|e| WriteError::OutputRoot(format!("{}: {}", root_name, e)))?;
        }

        NamedTempFile::new_in(&self.root)
            .map_err(|e| WriteError::OutputRoot(format!("{}: {}", root_name, e)))?;
        Ok(())
    }

    /// True while the output root is still an existing directory
    pub fn root_exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Writes `text` to `relative` under the root
    ///
    /// An existing file whose content matches apart from the capture
    /// timestamp is left untouched. Otherwise the text goes to a temporary
    /// file in the same directory that is then renamed over the target.
    ///
    /// # Arguments
    ///
    /// * `relative` - Path below the output root
    /// * `text` - Complete document text
    ///
    /// # Returns
    ///
    /// The `WriteOutcome` for the target file
    pub fn write(&self, relative: &Path, text: &str) -> Result<WriteOutcome, WriteError> {
        let target = self.root.join(relative);

        let existed = target.exists();
        if existed {
            let current = fs::read_to_string(&target).map_err(|e| io_error(&target, e))?;
            if strip_capture_timestamp(&current) == strip_capture_timestamp(text) {
                return Ok(WriteOutcome::Unchanged);
            }
        }

        write_atomic(&target, text.as_bytes())?;
        Ok(if existed {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        })
    }

    /// Writes the manifest as pretty-printed JSON
    ///
    /// # Arguments
    ///
    /// * `path` - Manifest location, absolute or relative to the working directory
    /// * `manifest` - Run record to serialize
    pub fn write_manifest(&self, path: &Path, manifest: &RunManifest) -> Result<(), WriteError> {
        let mut json = serde_json::to_string_pretty(manifest)?;
        json.push('\n');
        write_atomic(path, json.as_bytes())
    }
}

fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| io_error(&dir, e))?;
    tmp.write_all(bytes).map_err(|e| io_error(target, e))?;
    tmp.flush().map_err(|e| io_error(target, e))?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| io_error(target, e))?;
    tmp.persist(target).map_err(|e| io_error(target, e.error))?;
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> WriteError {
    WriteError::Io {
        path: path.display().to_string(),
        source,
    }
}
