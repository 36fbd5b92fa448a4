use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path} is unusable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl PersistError {
    fn output_dir(path: &Path, reason: impl ToString) -> Self {
        Self::OutputDir {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Create the run's root directory and prove a file can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    ensure_dir(dir)?;
    tempfile::Builder::new()
        .prefix(".probe-")
        .tempfile_in(dir)
        .map(drop)
        .map_err(|err| PersistError::output_dir(dir, err))
}

/// `create_dir_all` that tolerates a directory created concurrently by
/// another task but rejects a path occupied by a regular file.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    if let Err(err) = fs::create_dir_all(dir) {
        if !dir.is_dir() {
            return Err(PersistError::output_dir(dir, err));
        }
    }
    if dir.is_dir() {
        Ok(())
    } else {
        Err(PersistError::output_dir(dir, "not a directory"))
    }
}

/// Writes files into one directory through a temp file that is renamed into
/// place, so readers never observe a partially written file.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf, PersistError> {
        let mut tmp = self.temp_file(".part")?;
        tmp.write_all(content.as_ref())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        self.persist(tmp, filename)
    }

    /// Empty temp file inside the target directory, deleted on drop unless persisted.
    pub fn temp_file(&self, suffix: &str) -> Result<NamedTempFile, PersistError> {
        ensure_dir(&self.dir)?;
        Ok(tempfile::Builder::new()
            .prefix(".tmp-")
            .suffix(suffix)
            .tempfile_in(&self.dir)?)
    }

    /// Rename a finished temp file over `{dir}/{filename}`, replacing any previous version.
    pub fn persist(&self, tmp: NamedTempFile, filename: &str) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Remove `{dir}/{filename}`; a file that is already gone is not an error.
    pub fn remove(&self, filename: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.dir.join(filename)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PersistError::Io(err)),
        }
    }
}
