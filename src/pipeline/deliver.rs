//! Deliver stage: push the bound edition to object storage.
//!
//! Exactly two objects per edition: the cover thumbnail
//! (`cover_<edition>.jpg`, the staged page 1 as-is) and the full paper
//! (`<edition>.pdf`). There is no partial-success bookkeeping — if the PDF
//! upload fails after the cover went through, the attempt fails and the next
//! attempt re-uploads both. Object names are deterministic, so the re-upload
//! overwrites rather than duplicates.

use crate::error::PaperboyError;
use crate::progress::JobProgressCallback;
use crate::report::EditionBundle;
use crate::storage::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Upload the cover and the PDF; returns the `(cover, pdf)` object names.
pub async fn deliver(
    store: &Arc<dyn ObjectStore>,
    bundle: &EditionBundle,
    progress: Option<&Arc<dyn JobProgressCallback>>,
) -> Result<(String, String), PaperboyError> {
    require_file(&bundle.cover_file)?;
    require_file(&bundle.epaper_file)?;

    store.verify_bucket().await?;

    let cover_key = bundle.edition.cover_object();
    let pdf_key = bundle.edition.pdf_object();

    info!(
        "Delivering edition {} to bucket '{}'",
        bundle.edition,
        store.bucket()
    );

    store
        .put_file(&cover_key, "image/jpeg", &bundle.cover_file)
        .await?;
    if let Some(cb) = progress {
        cb.on_uploaded(&cover_key);
    }

    store
        .put_file(&pdf_key, "application/pdf", &bundle.epaper_file)
        .await?;
    if let Some(cb) = progress {
        cb.on_uploaded(&pdf_key);
    }

    Ok((cover_key, pdf_key))
}

fn require_file(path: &Path) -> Result<(), PaperboyError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PaperboyError::MissingFile {
            path: path.to_path_buf(),
        })
    }
}
