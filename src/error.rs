//! Error types for the paperboy library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PaperboyError`] — **Fatal to the attempt**: the current delivery
//!   attempt cannot proceed (manifest unreachable, staging unwritable,
//!   upload refused). Returned as `Err(PaperboyError)` from the pipeline
//!   stages and from [`crate::job::deliver_edition_once`]. The retry loop in
//!   [`crate::job::deliver_edition`] is the single point of recovery: it
//!   treats every variant uniformly — log, wait, run the whole pipeline
//!   again from scratch.
//!
//! * [`PageFailure`] — **Non-fatal**: one page image could not be fetched
//!   while the rest of the edition is fine. Only produced under
//!   [`crate::config::PageFailureMode::KeepNumbering`]; carried as values in
//!   the attempt report so callers can see which plates are missing.

use std::path::PathBuf;
use thiserror::Error;

/// All attempt-fatal errors returned by the paperboy library.
///
/// Variants are grouped by the failure surface they belong to: HTTP request,
/// manifest parse, local I/O, storage upload, configuration.
#[derive(Debug, Error)]
pub enum PaperboyError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The manifest GET failed at the transport level.
    #[error("Failed to fetch manifest from '{url}': {reason}")]
    ManifestRequest { url: String, reason: String },

    /// The manifest endpoint answered with a non-success status.
    ///
    /// The most common cause is an edition that has not been published yet
    /// (HTTP 404 before the morning cutoff).
    #[error("Manifest endpoint returned HTTP {status} for '{url}'")]
    ManifestStatus { url: String, status: u16 },

    /// A page image GET failed at the transport level.
    #[error("Failed to fetch page {page} from '{url}': {reason}")]
    PageRequest {
        page: usize,
        url: String,
        reason: String,
    },

    /// A page image endpoint answered with a non-success status.
    #[error("Page {page} endpoint returned HTTP {status} for '{url}'")]
    PageStatus {
        page: usize,
        url: String,
        status: u16,
    },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The manifest body was not valid JSON (or not the expected shape).
    #[error("Manifest from '{url}' is not valid JSON: {source}")]
    ManifestParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The staging directory could not be created or removed.
    #[error("Staging directory error at '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fetched page body could not be written to its staging file.
    #[error("Failed to write page {page} to '{path}': {source}")]
    PageWrite {
        page: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A staged image could not be read or decoded during binding.
    #[error("Failed to read page image '{path}': {detail}")]
    ImageRead { path: PathBuf, detail: String },

    /// The bound PDF could not be written.
    #[error("Failed to write PDF to '{path}': {detail}")]
    PdfWrite { path: PathBuf, detail: String },

    /// The manifest listed no pages, or every page was lost before binding.
    ///
    /// A zero-page e-paper is a broken publication, not a deliverable, so
    /// binding refuses to produce an empty document.
    #[error("Edition '{edition}' has no pages to bind")]
    EmptyEdition { edition: String },

    /// A file the delivery stage expected is missing from disk.
    #[error("Expected file not found: '{path}'")]
    MissingFile { path: PathBuf },

    // ── Upload errors ─────────────────────────────────────────────────────
    /// The target bucket could not be resolved (bad credentials, wrong name,
    /// or the storage service is unreachable).
    #[error("Bucket '{bucket}' is unavailable: {reason}")]
    BucketUnavailable { bucket: String, reason: String },

    /// An object transfer failed.
    #[error("Failed to upload '{key}' to bucket '{bucket}': {reason}")]
    Upload {
        bucket: String,
        key: String,
        reason: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A required environment variable is unset or empty.
    #[error("Environment variable {var} is not set\nExport it or pass the value via configuration.")]
    MissingEnv { var: &'static str },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure for a single page image.
///
/// Recorded in [`crate::report::DeliveryReceipt`] when the job runs with
/// [`crate::config::PageFailureMode::KeepNumbering`]; the plate is absent
/// from the bound PDF but all other page numbers keep their manifest
/// positions.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageFailure {
    /// The page GET failed at the transport level.
    #[error("Page {page}: request failed: {reason}")]
    Request { page: usize, reason: String },

    /// The page endpoint answered with a non-success status.
    #[error("Page {page}: HTTP {status}")]
    Status { page: usize, status: u16 },
}

impl PageFailure {
    /// Manifest position (1-based) of the failed page.
    pub fn page(&self) -> usize {
        match self {
            PageFailure::Request { page, .. } | PageFailure::Status { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_status_display() {
        let e = PaperboyError::ManifestStatus {
            url: "https://reader.example/mundo050324/manifest.json".into(),
            status: 404,
        };
        let msg = e.to_string();
        assert!(msg.contains("404"), "got: {msg}");
        assert!(msg.contains("mundo050324"));
    }

    #[test]
    fn empty_edition_display() {
        let e = PaperboyError::EmptyEdition {
            edition: "mundo010124".into(),
        };
        assert!(e.to_string().contains("mundo010124"));
    }

    #[test]
    fn upload_display_names_bucket_and_key() {
        let e = PaperboyError::Upload {
            bucket: "epaper-archive".into(),
            key: "mundo050324.pdf".into(),
            reason: "connection reset".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("epaper-archive"));
        assert!(msg.contains("mundo050324.pdf"));
    }

    #[test]
    fn page_failure_reports_position() {
        let f = PageFailure::Status {
            page: 7,
            status: 500,
        };
        assert_eq!(f.page(), 7);
        assert!(f.to_string().contains("500"));
    }
}
