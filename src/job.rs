//! Job driver: run the pipeline, retry the whole thing until it succeeds.
//!
//! ## Why retry the entire pipeline?
//!
//! The dominant failure is calendar, not code: the morning run starts before
//! the edition is published and the manifest 404s. Nothing downloaded
//! before the failure is worth protecting — a fresh attempt re-fetches the
//! manifest (which may have changed) and restages everything, so the stages
//! stay trivially simple and the driver is the single recovery point.
//!
//! Attempt states move strictly forward:
//!
//! ```text
//! Idle ─▶ FetchingManifest ─▶ FetchingPages ─▶ Binding ─▶ Uploading ─▶ Done
//!   ▲            │                  │             │            │
//!   └────────────┴──────────────────┴─────────────┴────────────┘
//!                      any error, after retry delay
//! ```
//!
//! With the default [`RetryPolicy`](crate::config::RetryPolicy) the loop
//! never gives up — a permanently missing edition keeps the process retrying
//! every 15 minutes until it is killed. That is the intended behaviour for
//! the cron-style deployment this crate serves; bound it with
//! [`max_attempts`](crate::config::JobConfigBuilder::max_attempts) when
//! embedding it somewhere less patient.

use crate::config::JobConfig;
use crate::edition::Edition;
use crate::error::PaperboyError;
use crate::pipeline::{bind, deliver, manifest, pages};
use crate::report::{DeliveryReceipt, EditionBundle, StageTimings};
use crate::staging::StagingArea;
use crate::storage::{ObjectStore, S3ObjectStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{error, info};

/// Deliver the configured edition, retrying per the retry policy.
///
/// This is the primary entry point for the library. The edition is resolved
/// once, before the first attempt — a job that starts on day X delivers day
/// X's paper no matter how long the retries drag on.
///
/// # Errors
/// Only returns `Err` when the retry policy is bounded and the last attempt
/// failed; with unlimited attempts the future resolves only on success.
pub async fn deliver_edition(config: &JobConfig) -> Result<DeliveryReceipt, PaperboyError> {
    let edition = config.resolve_edition();
    let client = http_client(config)?;
    info!("Starting delivery job for edition {}", edition);

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if let Some(cb) = &config.progress {
            cb.on_attempt_start(attempt, &edition);
        }

        match attempt_delivery(config, &client, &edition).await {
            Ok(mut receipt) => {
                receipt.attempts = attempt;
                if let Some(cb) = &config.progress {
                    cb.on_delivered(&edition, attempt);
                }
                info!(
                    "Edition {} delivered on attempt {}",
                    edition, attempt
                );
                return Ok(receipt);
            }
            Err(e) => {
                error!("Attempt {} for edition {} failed: {}", attempt, edition, e);
                if let Some(max) = config.retry.max_attempts {
                    if attempt >= max {
                        return Err(e);
                    }
                }
                if let Some(cb) = &config.progress {
                    cb.on_attempt_failed(attempt, &e.to_string(), config.retry.delay.as_secs());
                }
                info!(
                    "Retrying edition {} in {}s",
                    edition,
                    config.retry.delay.as_secs()
                );
                sleep(config.retry.delay).await;
            }
        }
    }
}

/// Run exactly one delivery attempt, no retry.
///
/// For callers that own their own scheduling (systemd timers, test
/// harnesses). Resolves the edition itself.
pub async fn deliver_edition_once(config: &JobConfig) -> Result<DeliveryReceipt, PaperboyError> {
    let edition = config.resolve_edition();
    let client = http_client(config)?;
    attempt_delivery(config, &client, &edition).await
}

/// One pass through manifest → pages → bind → deliver.
async fn attempt_delivery(
    config: &JobConfig,
    client: &reqwest::Client,
    edition: &Edition,
) -> Result<DeliveryReceipt, PaperboyError> {
    let total_start = Instant::now();
    let mut timings = StageTimings::default();

    let staging = {
        let area = StagingArea::create(config.staging_root.as_deref(), edition)?;
        if config.retain_staging {
            area.retain()
        } else {
            area
        }
    };

    // ── Manifest ─────────────────────────────────────────────────────────
    let stage_start = Instant::now();
    let url = config.manifest_url(edition);
    let manifest = manifest::fetch_manifest(client, &url, edition).await?;
    timings.manifest_ms = stage_start.elapsed().as_millis() as u64;
    if let Some(cb) = &config.progress {
        cb.on_manifest(manifest.page_count());
    }

    // ── Pages ────────────────────────────────────────────────────────────
    let stage_start = Instant::now();
    let outcome = pages::fetch_pages(
        client,
        &manifest,
        &staging,
        config.page_failure,
        config.progress.as_ref(),
    )
    .await?;
    timings.pages_ms = stage_start.elapsed().as_millis() as u64;

    // ── Bind ─────────────────────────────────────────────────────────────
    let stage_start = Instant::now();
    let pdf_path = staging.pdf_path(edition);
    bind::bind_pdf(&outcome.pages, &pdf_path, edition).await?;
    timings.bind_ms = stage_start.elapsed().as_millis() as u64;
    if let Some(cb) = &config.progress {
        cb.on_bound(outcome.pages.len());
    }

    let bundle = EditionBundle {
        edition: edition.clone(),
        cover_file: staging.page_path(1),
        epaper_file: pdf_path.clone(),
    };

    // ── Deliver ──────────────────────────────────────────────────────────
    let uploaded = if config.skip_upload {
        info!("Upload skipped; bound PDF at {}", pdf_path.display());
        None
    } else {
        let stage_start = Instant::now();
        let store = resolve_store(config)?;
        let keys = deliver::deliver(&store, &bundle, config.progress.as_ref()).await?;
        timings.deliver_ms = stage_start.elapsed().as_millis() as u64;
        Some(keys)
    };

    timings.total_ms = total_start.elapsed().as_millis() as u64;

    Ok(DeliveryReceipt {
        edition: edition.clone(),
        manifest_pages: manifest.page_count(),
        bound_pages: outcome.pages.len(),
        failed_pages: outcome.failures,
        uploaded,
        local_pdf: pdf_path,
        attempts: 1,
        timings,
    })
}

/// Resolve the object store, from most-specific to least-specific:
/// an injected store, explicit storage config, then the environment.
fn resolve_store(config: &JobConfig) -> Result<Arc<dyn ObjectStore>, PaperboyError> {
    if let Some(ref store) = config.store {
        return Ok(Arc::clone(store));
    }
    let storage = match config.storage {
        Some(ref s) => s.clone(),
        None => crate::config::StorageConfig::from_env()?,
    };
    Ok(Arc::new(S3ObjectStore::new(&storage)))
}

/// Shared HTTP client with the configured timeout on every request.
fn http_client(config: &JobConfig) -> Result<reqwest::Client, PaperboyError> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|e| PaperboyError::Internal(format!("HTTP client: {e}")))
}
