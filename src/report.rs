//! Result types handed between pipeline stages and back to callers.

use crate::edition::Edition;
use crate::error::PageFailure;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One successfully staged page image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedPage {
    /// 1-based manifest position; also the staging filename stem.
    pub page_num: usize,
    /// Local staging file holding the raw image bytes.
    pub path: PathBuf,
    /// Body size in bytes.
    pub bytes: u64,
}

/// What the pages stage produced for one attempt.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Staged pages in manifest order.
    pub pages: Vec<StagedPage>,
    /// Pages lost under [`crate::config::PageFailureMode::KeepNumbering`].
    /// Always empty under `Abort` (the attempt fails instead).
    pub failures: Vec<PageFailure>,
}

/// The local artifacts of one attempt, handed from binding to delivery.
///
/// `cover_file` is always staged page 1; `epaper_file` is the bound PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditionBundle {
    pub edition: Edition,
    pub cover_file: PathBuf,
    pub epaper_file: PathBuf,
}

/// Per-stage wall-clock timings for one successful attempt, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub manifest_ms: u64,
    pub pages_ms: u64,
    pub bind_ms: u64,
    pub deliver_ms: u64,
    pub total_ms: u64,
}

/// Returned by the job driver once an attempt completes end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// The edition that was delivered.
    pub edition: Edition,
    /// Pages listed by the manifest.
    pub manifest_pages: usize,
    /// Pages actually bound into the PDF.
    pub bound_pages: usize,
    /// Pages lost in `KeepNumbering` mode.
    pub failed_pages: Vec<PageFailure>,
    /// Uploaded object names `(cover, pdf)`; None when the upload stage was
    /// skipped (`skip_upload`).
    pub uploaded: Option<(String, String)>,
    /// Local bound PDF path; only meaningful when staging was retained or
    /// the upload was skipped (otherwise the file is gone with the staging
    /// directory).
    pub local_pdf: PathBuf,
    /// 1-based attempt number that succeeded.
    pub attempts: u32,
    pub timings: StageTimings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_round_trips_through_json() {
        let receipt = DeliveryReceipt {
            edition: Edition::from_id("mundo050324"),
            manifest_pages: 24,
            bound_pages: 24,
            failed_pages: vec![],
            uploaded: Some(("cover_mundo050324.jpg".into(), "mundo050324.pdf".into())),
            local_pdf: PathBuf::from("/tmp/mundo050324/mundo050324.pdf"),
            attempts: 2,
            timings: StageTimings::default(),
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let back: DeliveryReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back.edition.as_str(), "mundo050324");
        assert_eq!(back.attempts, 2);
        assert_eq!(
            back.uploaded.unwrap().0,
            "cover_mundo050324.jpg"
        );
    }
}
