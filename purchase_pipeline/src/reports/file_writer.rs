use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::*;
use tempfile::NamedTempFile;

use crate::{
    errors::ReportError,
    reports::{Artifact, ReportSink},
};

/// Writes artifacts into a reports directory.
///
/// Each artifact is written to a temporary file in the same directory and then renamed over the previous version, so a
/// reader never observes a partially written artifact.
#[derive(Debug, Clone)]
pub struct FileReportWriter {
    dir: PathBuf,
}

impl FileReportWriter {
    /// Creates the writer, creating `dir` (and its parents) if it does not exist yet.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, ReportError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| ReportError::CreateDirectory { path: dir.clone(), source })?;
        debug!("📝️ Reports will be written to {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }
}

impl ReportSink for FileReportWriter {
    fn write_artifact(&self, artifact: Artifact, contents: &[u8]) -> Result<(), ReportError> {
        let name = artifact.file_name();
        let path = self.path_of(artifact);
        let mut file = NamedTempFile::new_in(&self.dir).map_err(|source| ReportError::Write { artifact: name, source })?;
        file.write_all(contents).map_err(|source| ReportError::Write { artifact: name, source })?;
        file.as_file().sync_all().map_err(|source| ReportError::Write { artifact: name, source })?;
        file.persist(&path).map_err(|e| ReportError::Write { artifact: name, source: e.error })?;
        info!("📝️ Saved {name} to {}", path.display());
        Ok(())
    }
}
