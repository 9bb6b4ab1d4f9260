//! Per-edition staging directory with scoped cleanup.
//!
//! ## Why an owned guard rather than bare paths?
//!
//! The original job left its downloads behind after every run and every
//! failed retry, growing the temp directory by a full newspaper per attempt.
//! Wrapping the directory in [`StagingArea`] ties its lifetime to the
//! attempt: when the guard drops — success, error, or panic — the directory
//! goes with it, unless the caller opted into retention.

use crate::edition::Edition;
use crate::error::PaperboyError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One edition's staging directory: downloaded page images and the bound PDF.
///
/// Created by [`StagingArea::create`]; removed on drop unless `retain` was
/// set. Page files are named `<page>.jpg` by 1-based manifest position.
pub struct StagingArea {
    dir: PathBuf,
    retain: bool,
}

impl StagingArea {
    /// Create (idempotently) the staging directory for an edition.
    ///
    /// `root` defaults to the system temp directory when `None`.
    pub fn create(root: Option<&Path>, edition: &Edition) -> Result<Self, PaperboyError> {
        let root = root
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        let dir = root.join(edition.as_str());

        std::fs::create_dir_all(&dir).map_err(|source| PaperboyError::Staging {
            path: dir.clone(),
            source,
        })?;
        debug!("Staging directory ready: {}", dir.display());

        Ok(Self { dir, retain: false })
    }

    /// Keep the directory on drop.
    pub fn retain(mut self) -> Self {
        self.retain = true;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Staging file path for a page (1-based manifest position).
    pub fn page_path(&self, page: usize) -> PathBuf {
        self.dir.join(format!("{page}.jpg"))
    }

    /// Local path of the bound PDF for this edition.
    pub fn pdf_path(&self, edition: &Edition) -> PathBuf {
        self.dir.join(edition.pdf_filename())
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.retain {
            debug!("Retaining staging directory: {}", self.dir.display());
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            // Cleanup failure is not worth failing (or panicking) over.
            warn!(
                "Could not remove staging directory {}: {}",
                self.dir.display(),
                e
            );
        }
    }
}
