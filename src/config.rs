//! Configuration types for an e-paper delivery job.
//!
//! All job behaviour is controlled through [`JobConfig`], built via its
//! [`JobConfigBuilder`]. Keeping every knob in one struct makes it trivial to
//! pass the whole job description into [`crate::job::deliver_edition`], to
//! log it, and to diff two runs to understand why their outcomes differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::edition::Edition;
use crate::error::PaperboyError;
use crate::progress::JobProgressCallback;
use crate::storage::ObjectStore;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for one e-paper delivery job.
///
/// Built via [`JobConfig::builder()`] or [`JobConfig::default()`].
///
/// # Example
/// ```rust
/// use paperboy::JobConfig;
/// use std::time::Duration;
///
/// let config = JobConfig::builder()
///     .retry_delay(Duration::from_secs(60))
///     .max_attempts(Some(5))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct JobConfig {
    /// Base URL of the reader service. Default: the El Mundo reader feed.
    ///
    /// The manifest for an edition lives at
    /// `<base_url>/<edition>/<manifest_file>`.
    pub base_url: String,

    /// Manifest filename appended to the edition URL. Default: `reader3_4.json`.
    pub manifest_file: String,

    /// Prefix of the date-derived edition identifier. Default: `mundo`.
    pub edition_prefix: String,

    /// Publishing cutoff in hours subtracted from the current UTC time
    /// before deriving the edition date. Default: 6.
    ///
    /// The feed publishes on the paper's local calendar, several timezones
    /// behind UTC. Without the shift, a run shortly after midnight UTC would
    /// ask for an edition that does not exist yet.
    pub cutoff_hours: i64,

    /// Explicit edition to deliver. If None, the edition is derived from the
    /// current date and `cutoff_hours` at the start of each job.
    pub edition: Option<Edition>,

    /// Root directory for per-edition staging directories.
    /// If None, the system temp directory is used.
    pub staging_root: Option<PathBuf>,

    /// Keep the staging directory (downloaded pages + bound PDF) after the
    /// job finishes. Default: false.
    ///
    /// The staging directory is otherwise removed when the attempt's
    /// [`crate::staging::StagingArea`] is dropped, on success and on failure
    /// alike. Retaining it is useful for debugging a bad edition or for
    /// keeping a local day-cache.
    pub retain_staging: bool,

    /// Timeout applied to every HTTP request. Default: 30 s.
    ///
    /// A hung reader endpoint would otherwise stall the job forever — there
    /// is exactly one thread of control and no concurrent watchdog.
    pub http_timeout: Duration,

    /// What to do when a single page image fails to download.
    /// Default: [`PageFailureMode::Abort`].
    pub page_failure: PageFailureMode,

    /// Retry policy for the whole-job loop. Default: retry forever, 15 min
    /// between attempts.
    pub retry: RetryPolicy,

    /// Storage credentials and bucket. If None, read from the
    /// `PAPERBOY_STORAGE_*` environment variables when the job first needs
    /// to upload.
    pub storage: Option<StorageConfig>,

    /// Pre-constructed object store. Takes precedence over `storage`.
    ///
    /// This is the seam tests use to inject a recording mock, and callers
    /// can use to wrap the real client with middleware.
    pub store: Option<Arc<dyn ObjectStore>>,

    /// Progress callback for per-stage events. Default: none.
    pub progress: Option<Arc<dyn JobProgressCallback>>,

    /// Stop after binding the PDF; skip the upload stage. Default: false.
    ///
    /// The receipt then carries the local file paths and no object names.
    pub skip_upload: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            base_url: "https://reader3.isu.pub/elmundocomsv".to_string(),
            manifest_file: "reader3_4.json".to_string(),
            edition_prefix: "mundo".to_string(),
            cutoff_hours: 6,
            edition: None,
            staging_root: None,
            retain_staging: false,
            http_timeout: Duration::from_secs(30),
            page_failure: PageFailureMode::Abort,
            retry: RetryPolicy::default(),
            storage: None,
            store: None,
            progress: None,
            skip_upload: false,
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("base_url", &self.base_url)
            .field("manifest_file", &self.manifest_file)
            .field("edition_prefix", &self.edition_prefix)
            .field("cutoff_hours", &self.cutoff_hours)
            .field("edition", &self.edition)
            .field("staging_root", &self.staging_root)
            .field("retain_staging", &self.retain_staging)
            .field("http_timeout", &self.http_timeout)
            .field("page_failure", &self.page_failure)
            .field("retry", &self.retry)
            .field("storage", &self.storage)
            .field("store", &self.store.as_ref().map(|_| "<dyn ObjectStore>"))
            .field("skip_upload", &self.skip_upload)
            .finish()
    }
}

impl JobConfig {
    /// Create a new builder for `JobConfig`.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder {
            config: Self::default(),
        }
    }

    /// The edition this job will deliver, resolving the date if needed.
    pub fn resolve_edition(&self) -> Edition {
        self.edition
            .clone()
            .unwrap_or_else(|| Edition::today(&self.edition_prefix, self.cutoff_hours))
    }

    /// The manifest URL for an edition.
    pub fn manifest_url(&self, edition: &Edition) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            edition,
            self.manifest_file
        )
    }
}

/// Builder for [`JobConfig`].
#[derive(Debug)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn manifest_file(mut self, name: impl Into<String>) -> Self {
        self.config.manifest_file = name.into();
        self
    }

    pub fn edition_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.edition_prefix = prefix.into();
        self
    }

    pub fn cutoff_hours(mut self, hours: i64) -> Self {
        self.config.cutoff_hours = hours.clamp(-24, 24);
        self
    }

    pub fn edition(mut self, edition: Edition) -> Self {
        self.config.edition = Some(edition);
        self
    }

    pub fn staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.staging_root = Some(root.into());
        self
    }

    pub fn retain_staging(mut self, v: bool) -> Self {
        self.config.retain_staging = v;
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout.max(Duration::from_secs(1));
        self
    }

    pub fn page_failure(mut self, mode: PageFailureMode) -> Self {
        self.config.page_failure = mode;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.delay = delay;
        self
    }

    pub fn max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = Some(storage);
        self
    }

    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.config.store = Some(store);
        self
    }

    pub fn progress(mut self, callback: Arc<dyn JobProgressCallback>) -> Self {
        self.config.progress = Some(callback);
        self
    }

    pub fn skip_upload(mut self, v: bool) -> Self {
        self.config.skip_upload = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<JobConfig, PaperboyError> {
        let c = &self.config;
        if c.base_url.trim().is_empty() {
            return Err(PaperboyError::InvalidConfig("base_url is empty".into()));
        }
        if c.manifest_file.trim().is_empty() {
            return Err(PaperboyError::InvalidConfig(
                "manifest_file is empty".into(),
            ));
        }
        if c.edition_prefix.trim().is_empty() && c.edition.is_none() {
            return Err(PaperboyError::InvalidConfig(
                "edition_prefix is empty and no explicit edition was given".into(),
            ));
        }
        if let Some(max) = c.retry.max_attempts {
            if max == 0 {
                return Err(PaperboyError::InvalidConfig(
                    "max_attempts must be ≥ 1 when set".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums & sub-configs ──────────────────────────────────────────────────

/// What a failed page-image download does to the attempt.
///
/// The feed's original client silently skipped failed pages *and* renumbered
/// every following page, so one bad download shifted the whole paper by a
/// page. Neither behaviour survives here; the two defensible options are:
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum PageFailureMode {
    /// Fail the attempt on the first page failure. (default)
    ///
    /// The retry loop re-downloads everything anyway, so aborting early
    /// costs nothing and never ships an incomplete paper.
    #[default]
    Abort,

    /// Record the failure, keep the page's manifest number, continue.
    ///
    /// Page k's file is always `<k>.jpg` whether or not page k−1 succeeded;
    /// the bound PDF simply lacks the failed plates. The cover (page 1)
    /// failing is fatal even in this mode — delivery uploads `1.jpg`.
    KeepNumbering,
}

/// How the whole-job retry loop behaves between attempts.
///
/// The delay is fixed — no exponential backoff. The reader feed fails for
/// calendar reasons (edition not published yet), not load reasons, so
/// backing off further than the fixed window gains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Wait between failed attempts. Default: 15 minutes.
    pub delay: Duration,

    /// Total attempt cap. `None` retries forever — the job only ends by
    /// succeeding or by being killed. Default: `None`.
    ///
    /// Tests set `Some(n)` together with a zero delay to drive the loop
    /// deterministically.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(15 * 60),
            max_attempts: None,
        }
    }
}

/// Credentials and addressing for the storage service.
#[derive(Clone)]
pub struct StorageConfig {
    /// Access key id.
    pub key_id: String,
    /// Secret application key.
    pub key: String,
    /// Target bucket name.
    pub bucket: String,
    /// Storage region. Default: `us-east-1`.
    pub region: String,
    /// Custom endpoint URL for S3-compatible services (Backblaze, MinIO, …).
    pub endpoint: Option<String>,
}

impl StorageConfig {
    pub const ENV_KEY_ID: &'static str = "PAPERBOY_STORAGE_KEY_ID";
    pub const ENV_KEY: &'static str = "PAPERBOY_STORAGE_KEY";
    pub const ENV_BUCKET: &'static str = "PAPERBOY_STORAGE_BUCKET";
    pub const ENV_REGION: &'static str = "PAPERBOY_STORAGE_REGION";
    pub const ENV_ENDPOINT: &'static str = "PAPERBOY_STORAGE_ENDPOINT";

    /// Read the storage configuration from `PAPERBOY_STORAGE_*` variables.
    ///
    /// Key id, key, and bucket are required; region and endpoint are
    /// optional.
    pub fn from_env() -> Result<Self, PaperboyError> {
        let require = |var: &'static str| -> Result<String, PaperboyError> {
            match std::env::var(var) {
                Ok(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(PaperboyError::MissingEnv { var }),
            }
        };

        Ok(Self {
            key_id: require(Self::ENV_KEY_ID)?,
            key: require(Self::ENV_KEY)?,
            bucket: require(Self::ENV_BUCKET)?,
            region: std::env::var(Self::ENV_REGION).unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: std::env::var(Self::ENV_ENDPOINT).ok().filter(|v| !v.is_empty()),
        })
    }
}

impl fmt::Debug for StorageConfig {
    // The secret key never reaches logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("key_id", &self.key_id)
            .field("key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_original_job() {
        let c = JobConfig::default();
        assert_eq!(c.edition_prefix, "mundo");
        assert_eq!(c.cutoff_hours, 6);
        assert_eq!(c.retry.delay, Duration::from_secs(900));
        assert_eq!(c.retry.max_attempts, None);
        assert_eq!(c.page_failure, PageFailureMode::Abort);
    }

    #[test]
    fn manifest_url_joins_base_edition_and_file() {
        let c = JobConfig::builder()
            .base_url("https://reader.example/feed/")
            .build()
            .unwrap();
        let edition = Edition::from_id("mundo050324");
        assert_eq!(
            c.manifest_url(&edition),
            "https://reader.example/feed/mundo050324/reader3_4.json"
        );
    }

    #[test]
    fn build_rejects_zero_max_attempts() {
        let err = JobConfig::builder().max_attempts(Some(0)).build();
        assert!(matches!(err, Err(PaperboyError::InvalidConfig(_))));
    }

    #[test]
    fn build_rejects_empty_base_url() {
        let err = JobConfig::builder().base_url("  ").build();
        assert!(matches!(err, Err(PaperboyError::InvalidConfig(_))));
    }

    #[test]
    fn storage_debug_redacts_secret() {
        let s = StorageConfig {
            key_id: "AKIA123".into(),
            key: "super-secret".into(),
            bucket: "epaper".into(),
            region: "us-east-1".into(),
            endpoint: None,
        };
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("AKIA123"));
    }
}
