//! Pages stage: stream every page image into the staging directory.
//!
//! Downloads are strictly sequential in manifest order — the feed's CDN
//! throttles aggressive clients, and a daily batch job gains nothing from
//! parallelism it would have to coordinate. Page `k` of the manifest is
//! always written to `<staging>/<k>.jpg`, so the numbering on disk matches
//! the printed paper no matter what happened to earlier pages.
//!
//! ## Page failures
//!
//! What a failed download does to the attempt is the caller's choice via
//! [`PageFailureMode`]: abort (default), or record the loss and keep going
//! with numbering intact. A failed *cover* (page 1) is fatal in both modes,
//! because delivery uploads `1.jpg` as the edition thumbnail.
//!
//! Bodies are streamed chunk-by-chunk to disk rather than buffered — a page
//! scan is tens of megabytes, and a whole paper of them does not belong in
//! memory.

use crate::config::PageFailureMode;
use crate::error::{PageFailure, PaperboyError};
use crate::pipeline::manifest::Manifest;
use crate::progress::JobProgressCallback;
use crate::report::{FetchOutcome, StagedPage};
use crate::staging::StagingArea;
use futures::StreamExt;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Download all page images listed by the manifest into the staging area.
///
/// Returns the staged pages in manifest order, plus any failures recorded
/// under [`PageFailureMode::KeepNumbering`].
pub async fn fetch_pages(
    client: &reqwest::Client,
    manifest: &Manifest,
    staging: &StagingArea,
    mode: PageFailureMode,
    progress: Option<&Arc<dyn JobProgressCallback>>,
) -> Result<FetchOutcome, PaperboyError> {
    let total = manifest.page_count();
    let mut outcome = FetchOutcome::default();

    for (idx, descriptor) in manifest.document.pages.iter().enumerate() {
        let page_num = idx + 1;
        let url = descriptor.image_url();
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }
        debug!("Requesting page {}/{}: {}", page_num, total, url);

        match fetch_one(client, &url, page_num, staging).await {
            Ok(staged) => {
                if let Some(cb) = progress {
                    cb.on_page_done(page_num, total, staged.bytes);
                }
                outcome.pages.push(staged);
            }
            Err(FetchError::Fatal(e)) => return Err(e),
            Err(FetchError::Page(failure)) => {
                // The cover doubles as the uploaded thumbnail; an edition
                // without page 1 is undeliverable regardless of mode.
                if page_num == 1 {
                    return Err(failure_to_fatal(failure, &url));
                }
                match mode {
                    PageFailureMode::Abort => {
                        return Err(failure_to_fatal(failure, &url));
                    }
                    PageFailureMode::KeepNumbering => {
                        warn!("Skipping page {}/{}: {}", page_num, total, failure);
                        if let Some(cb) = progress {
                            cb.on_page_failed(page_num, total, &failure.to_string());
                        }
                        outcome.failures.push(failure);
                    }
                }
            }
        }
    }

    info!(
        "Staged {}/{} pages in {}",
        outcome.pages.len(),
        total,
        staging.dir().display()
    );
    Ok(outcome)
}

/// Remote trouble is per-page (mode decides); local trouble is always fatal.
enum FetchError {
    Page(PageFailure),
    Fatal(PaperboyError),
}

fn failure_to_fatal(failure: PageFailure, url: &str) -> PaperboyError {
    match failure {
        PageFailure::Request { page, reason } => PaperboyError::PageRequest {
            page,
            url: url.to_string(),
            reason,
        },
        PageFailure::Status { page, status } => PaperboyError::PageStatus {
            page,
            url: url.to_string(),
            status,
        },
    }
}

/// Stream one page image to its staging file.
async fn fetch_one(
    client: &reqwest::Client,
    url: &str,
    page_num: usize,
    staging: &StagingArea,
) -> Result<StagedPage, FetchError> {
    let response = client.get(url).send().await.map_err(|e| {
        FetchError::Page(PageFailure::Request {
            page: page_num,
            reason: e.to_string(),
        })
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Page(PageFailure::Status {
            page: page_num,
            status: status.as_u16(),
        }));
    }

    let path = staging.page_path(page_num);
    let mut file = tokio::fs::File::create(&path).await.map_err(|source| {
        FetchError::Fatal(PaperboyError::PageWrite {
            page: page_num,
            path: path.clone(),
            source,
        })
    })?;

    let mut bytes: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                // Drop the partial file so a later attempt never binds a
                // truncated image.
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(FetchError::Page(PageFailure::Request {
                    page: page_num,
                    reason: format!("body stream interrupted: {e}"),
                }));
            }
        };
        bytes += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(|source| {
            FetchError::Fatal(PaperboyError::PageWrite {
                page: page_num,
                path: path.clone(),
                source,
            })
        })?;
    }

    file.flush().await.map_err(|source| {
        FetchError::Fatal(PaperboyError::PageWrite {
            page: page_num,
            path: path.clone(),
            source,
        })
    })?;

    Ok(StagedPage {
        page_num,
        path,
        bytes,
    })
}
