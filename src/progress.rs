//! Progress-callback trait for per-stage job events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::JobConfigBuilder::progress`] to receive real-time events
//! as the pipeline moves through its stages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, a systemd journal, or a terminal
//! progress bar — without the library knowing anything about how the host
//! application communicates. The pipeline is sequential, so implementations
//! never see concurrent calls, but the trait is still `Send + Sync` because
//! the job future may migrate between runtime threads.

use crate::edition::Edition;

/// Called by the delivery pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait JobProgressCallback: Send + Sync {
    /// A new attempt is starting (1-based).
    fn on_attempt_start(&self, _attempt: u32, _edition: &Edition) {}

    /// The manifest was fetched and parsed; `pages` is the page count.
    fn on_manifest(&self, _pages: usize) {}

    /// A page download is starting.
    fn on_page_start(&self, _page: usize, _total: usize) {}

    /// A page was staged successfully.
    fn on_page_done(&self, _page: usize, _total: usize, _bytes: u64) {}

    /// A page download failed (only non-fatal in `KeepNumbering` mode).
    fn on_page_failed(&self, _page: usize, _total: usize, _error: &str) {}

    /// The PDF was bound; `pages` is the number of plates it contains.
    fn on_bound(&self, _pages: usize) {}

    /// One object finished uploading.
    fn on_uploaded(&self, _object: &str) {}

    /// The attempt failed; the driver will sleep `delay_secs` and retry
    /// (or give up if the attempt cap is reached).
    fn on_attempt_failed(&self, _attempt: u32, _error: &str, _delay_secs: u64) {}

    /// The job completed end to end.
    fn on_delivered(&self, _edition: &Edition, _attempts: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        pages: AtomicUsize,
    }

    impl JobProgressCallback for Counting {
        fn on_page_done(&self, _page: usize, _total: usize, _bytes: u64) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_methods_are_no_ops() {
        let cb = Counting {
            pages: AtomicUsize::new(0),
        };
        // Only the overridden method observes anything.
        cb.on_manifest(10);
        cb.on_page_done(1, 10, 4096);
        cb.on_delivered(&Edition::from_id("mundo050324"), 1);
        assert_eq!(cb.pages.load(Ordering::SeqCst), 1);
    }
}
