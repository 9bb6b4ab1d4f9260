//! # paperboy
//!
//! Fetch a daily e-paper edition, bind its pages into a PDF, and deliver it
//! to object storage.
//!
//! ## Why this crate?
//!
//! The publisher's reader service exposes each day's paper as a JSON
//! manifest plus one scan image per page — fine for a browser widget,
//! useless for archiving or offline reading. This crate turns that feed
//! back into a newspaper: one A4 PDF per edition, uploaded next to its
//! cover thumbnail under date-derived names, by a job that keeps retrying
//! until the edition actually exists.
//!
//! ## Pipeline Overview
//!
//! ```text
//! edition id (date − cutoff)
//!  │
//!  ├─ 1. Manifest  GET <base-url>/<edition>/<manifest-file>, parse JSON
//!  ├─ 2. Pages     stream each page image to <staging>/<n>.jpg, in order
//!  ├─ 3. Bind      embed the JPEGs as full-bleed A4 plates in one PDF
//!  └─ 4. Deliver   upload cover_<edition>.jpg and <edition>.pdf
//! ```
//!
//! Stages run strictly in sequence; any failure aborts the attempt, and the
//! job driver retries the whole pipeline after a fixed delay — forever, by
//! default, because the usual failure is simply an edition that has not
//! been published yet.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperboy::{deliver_edition, JobConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Storage credentials from PAPERBOY_STORAGE_{KEY_ID,KEY,BUCKET}
//!     let config = JobConfig::default();
//!     let receipt = deliver_edition(&config).await?;
//!     println!(
//!         "delivered {} ({} pages, attempt {})",
//!         receipt.edition, receipt.bound_pages, receipt.attempts
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paperboy` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! paperboy = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod edition;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod staging;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{JobConfig, JobConfigBuilder, PageFailureMode, RetryPolicy, StorageConfig};
pub use edition::Edition;
pub use error::{PageFailure, PaperboyError};
pub use job::{deliver_edition, deliver_edition_once};
pub use pipeline::manifest::{fetch_manifest, Manifest, PageDescriptor};
pub use progress::JobProgressCallback;
pub use report::{DeliveryReceipt, EditionBundle, StagedPage, StageTimings};
pub use storage::{ObjectStore, S3ObjectStore};
