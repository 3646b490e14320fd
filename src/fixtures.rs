//! Collects source files that made an extraction fail, so failures can be
//! replayed as test fixtures.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Error;

/// Default collection directory, relative to the repository root.
pub const DEFAULT_DIR: &str = "tests/fixtures/collected";

/// Manifest file written into the collection directory.
const MANIFEST: &str = "manifest.json";

/// One recorded failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CollectedError {
    /// Rendered error message.
    pub error: String,
    /// Name of the copied source file inside the collection directory.
    pub file: String,
    /// Template whose call failed.
    pub template: String,
}

/// Copies failing sources into `dir` and remembers why they failed.
#[derive(Debug)]
pub struct FixtureCollector {
    /// Names already copied.
    copied: Vec<String>,
    /// Collection directory.
    dir: PathBuf,
    /// Failures in the order they were seen.
    errors: Vec<CollectedError>,
}

impl FixtureCollector {
    /// Collector writing into `dir`. Nothing touches the disk until a failure is collected.
    pub fn new(dir: PathBuf) -> Self {
        return Self {
            copied: Vec::new(),
            dir,
            errors: Vec::new(),
        };
    }

    /// Record a failure for `source`, copying the file on first sight.
    /// Sources that cannot be read (for example a missing file) are recorded without a copy.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the collection directory cannot be created.
    pub fn collect(&mut self, source: &Path, error: &Error, template: &Path) -> Result<(), Error> {
        let name = source
            .file_name()
            .map_or_else(|| return "unknown".to_string(), |n| return n.to_string_lossy().into_owned());

        if !self.copied.contains(&name) && source.is_file() {
            std::fs::create_dir_all(&self.dir)?;
            if let Err(e) = std::fs::copy(source, self.dir.join(&name)) {
                tracing::warn!(source = %source.display(), error = %e, "could not copy fixture");
            } else {
                self.copied.push(name.clone());
            }
        }

        self.errors.push(CollectedError {
            error: error.to_string(),
            file: name,
            template: template.display().to_string(),
        });
        return Ok(());
    }

    /// Number of failures recorded so far.
    pub fn len(&self) -> usize {
        return self.errors.len();
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        return self.errors.is_empty();
    }

    /// Write `manifest.json`. Returns its path, or `None` when nothing was collected.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` or `Error::Json` if the manifest cannot be written.
    pub fn write_manifest(&self) -> Result<Option<PathBuf>, Error> {
        if self.is_empty() {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(MANIFEST);
        let json = serde_json::to_string_pretty(&self.errors)?;
        std::fs::write(&path, json)?;
        tracing::info!(path = %path.display(), count = self.errors.len(), "wrote fixture manifest");
        return Ok(Some(path));
    }
}
