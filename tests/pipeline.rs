//! End-to-end pipeline tests against a local canned-HTTP listener.
//!
//! No live feed and no real bucket: a `TcpListener` speaks just enough
//! HTTP/1.1 to stand in for the reader service, and a recording mock stands
//! in for the object store. Everything runs hermetically and fast, so the
//! retry loop can be driven with zero delay.

use paperboy::{
    deliver_edition, deliver_edition_once, Edition, JobConfig, JobProgressCallback, ObjectStore,
    PageFailureMode, PaperboyError,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

// ── Canned-HTTP test server ──────────────────────────────────────────────────

/// Path → (status, content type, body). Mutable so tests can "publish" an
/// edition between retry attempts.
type Routes = Arc<Mutex<HashMap<String, (u16, String, Vec<u8>)>>>;

fn routes(entries: Vec<(&str, u16, &str, Vec<u8>)>) -> Routes {
    Arc::new(Mutex::new(
        entries
            .into_iter()
            .map(|(path, status, ctype, body)| {
                (path.to_string(), (status, ctype.to_string(), body))
            })
            .collect(),
    ))
}

/// Serve `routes` on an ephemeral local port; returns the bound address.
async fn serve(routes: Routes) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                // Read until the end of the request headers (GETs carry no body).
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            request.extend_from_slice(&chunk[..n]);
                            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, ctype, body) = routes
                    .lock()
                    .unwrap()
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, "text/plain".to_string(), b"not found".to_vec()));

                let head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    if status == 200 { "OK" } else { "Error" },
                    ctype,
                    body.len(),
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

const EDITION: &str = "mundo050324";

/// A small but genuine JPEG, produced by the `image` crate.
fn jpeg_fixture() -> Vec<u8> {
    let img = image::RgbImage::from_fn(60, 80, |x, y| {
        image::Rgb([(x * 4) as u8, (y * 3) as u8, 128])
    });
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

/// Manifest JSON for `n` pages whose images live on `addr`.
///
/// The imageUri values are scheme-less host-and-path strings, exactly as the
/// live feed serves them; the pages stage is expected to prepend `http://`.
fn manifest_body(n: usize, addr: SocketAddr) -> Vec<u8> {
    let pages: Vec<serde_json::Value> = (1..=n)
        .map(|i| serde_json::json!({"imageUri": format!("{addr}/pages/{i}.jpg")}))
        .collect();
    serde_json::to_vec(&serde_json::json!({"document": {"pages": pages}})).unwrap()
}

fn manifest_path() -> String {
    format!("/{EDITION}/reader3_4.json")
}

/// Routes for a healthy `n`-page edition.
fn edition_routes(n: usize, addr: SocketAddr) -> Vec<(String, u16, String, Vec<u8>)> {
    let mut entries = vec![(
        manifest_path(),
        200,
        "application/json".to_string(),
        manifest_body(n, addr),
    )];
    for i in 1..=n {
        entries.push((
            format!("/pages/{i}.jpg"),
            200,
            "image/jpeg".to_string(),
            jpeg_fixture(),
        ));
    }
    entries
}

/// Two-step setup: bind the listener first (the manifest must embed the
/// port), then fill in the routes.
async fn serve_edition(n: usize) -> (SocketAddr, Routes) {
    let table = routes(vec![]);
    let addr = serve(Arc::clone(&table)).await;
    let mut guard = table.lock().unwrap();
    for (path, status, ctype, body) in edition_routes(n, addr) {
        guard.insert(path, (status, ctype, body));
    }
    drop(guard);
    (addr, table)
}

// ── Recording object store ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum StoreEvent {
    Verified,
    Put {
        key: String,
        content_type: String,
        bytes: u64,
    },
}

struct RecordingStore {
    events: Mutex<Vec<StoreEvent>>,
    fail_puts: bool,
}

impl RecordingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            fail_puts: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            fail_puts: true,
        })
    }

    fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ObjectStore for RecordingStore {
    fn bucket(&self) -> &str {
        "test-bucket"
    }

    async fn verify_bucket(&self) -> Result<(), PaperboyError> {
        self.events.lock().unwrap().push(StoreEvent::Verified);
        Ok(())
    }

    async fn put_file(
        &self,
        key: &str,
        content_type: &str,
        path: &Path,
    ) -> Result<u64, PaperboyError> {
        if self.fail_puts {
            return Err(PaperboyError::Upload {
                bucket: "test-bucket".into(),
                key: key.to_string(),
                reason: "injected failure".into(),
            });
        }
        let bytes = std::fs::metadata(path)
            .map_err(|_| PaperboyError::MissingFile {
                path: path.to_path_buf(),
            })?
            .len();
        self.events.lock().unwrap().push(StoreEvent::Put {
            key: key.to_string(),
            content_type: content_type.to_string(),
            bytes,
        });
        Ok(bytes)
    }
}

// ── Config helper ────────────────────────────────────────────────────────────

fn test_config(addr: SocketAddr, store: Arc<RecordingStore>, staging: &Path) -> JobConfig {
    JobConfig::builder()
        .base_url(format!("http://{addr}"))
        .edition(Edition::from_id(EDITION))
        .staging_root(staging)
        .retain_staging(true)
        .retry_delay(Duration::ZERO)
        .max_attempts(Some(1))
        .store(store as Arc<dyn ObjectStore>)
        .build()
        .unwrap()
}

fn pdf_page_count(path: &Path) -> usize {
    lopdf::Document::load(path).unwrap().get_pages().len()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delivers_full_edition() {
    let (addr, _routes) = serve_edition(3).await;
    let staging = tempfile::tempdir().unwrap();
    let store = RecordingStore::new();
    let config = test_config(addr, Arc::clone(&store), staging.path());

    let receipt = deliver_edition(&config).await.expect("delivery succeeds");

    assert_eq!(receipt.edition.as_str(), EDITION);
    assert_eq!(receipt.manifest_pages, 3);
    assert_eq!(receipt.bound_pages, 3);
    assert!(receipt.failed_pages.is_empty());
    assert_eq!(receipt.attempts, 1);
    assert_eq!(
        receipt.uploaded,
        Some((format!("cover_{EDITION}.jpg"), format!("{EDITION}.pdf")))
    );

    // The Nth manifest entry became plate N of a 3-plate PDF.
    assert_eq!(pdf_page_count(&receipt.local_pdf), 3);

    // Exactly two objects, bucket verified before any transfer.
    let events = store.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], StoreEvent::Verified);
    match (&events[1], &events[2]) {
        (
            StoreEvent::Put {
                key: cover,
                content_type: cover_ct,
                bytes: cover_bytes,
            },
            StoreEvent::Put {
                key: pdf,
                content_type: pdf_ct,
                ..
            },
        ) => {
            assert_eq!(cover, &format!("cover_{EDITION}.jpg"));
            assert_eq!(cover_ct, "image/jpeg");
            assert_eq!(*cover_bytes, jpeg_fixture().len() as u64);
            assert_eq!(pdf, &format!("{EDITION}.pdf"));
            assert_eq!(pdf_ct, "application/pdf");
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn missing_page_aborts_by_default() {
    let (addr, table) = serve_edition(3).await;
    table
        .lock()
        .unwrap()
        .insert("/pages/2.jpg".into(), (404, "text/plain".into(), vec![]));

    let staging = tempfile::tempdir().unwrap();
    let config = test_config(addr, RecordingStore::new(), staging.path());

    let err = deliver_edition(&config).await.unwrap_err();
    assert!(
        matches!(err, PaperboyError::PageStatus { page: 2, status: 404, .. }),
        "got: {err}"
    );
}

#[tokio::test]
async fn keep_numbering_preserves_manifest_positions() {
    let (addr, table) = serve_edition(3).await;
    table
        .lock()
        .unwrap()
        .insert("/pages/2.jpg".into(), (500, "text/plain".into(), vec![]));

    let staging = tempfile::tempdir().unwrap();
    let store = RecordingStore::new();
    let mut config = test_config(addr, Arc::clone(&store), staging.path());
    config.page_failure = PageFailureMode::KeepNumbering;

    let receipt = deliver_edition(&config).await.expect("delivery succeeds");

    assert_eq!(receipt.manifest_pages, 3);
    assert_eq!(receipt.bound_pages, 2);
    assert_eq!(receipt.failed_pages.len(), 1);
    assert_eq!(receipt.failed_pages[0].page(), 2);
    assert_eq!(pdf_page_count(&receipt.local_pdf), 2);

    // Page 3 kept its manifest number; nothing shifted into slot 2.
    let edition_dir = staging.path().join(EDITION);
    assert!(edition_dir.join("1.jpg").is_file());
    assert!(!edition_dir.join("2.jpg").exists());
    assert!(edition_dir.join("3.jpg").is_file());
}

#[tokio::test]
async fn cover_failure_is_fatal_even_when_keeping_numbering() {
    let (addr, table) = serve_edition(2).await;
    table
        .lock()
        .unwrap()
        .insert("/pages/1.jpg".into(), (404, "text/plain".into(), vec![]));

    let staging = tempfile::tempdir().unwrap();
    let mut config = test_config(addr, RecordingStore::new(), staging.path());
    config.page_failure = PageFailureMode::KeepNumbering;

    let err = deliver_edition(&config).await.unwrap_err();
    assert!(
        matches!(err, PaperboyError::PageStatus { page: 1, .. }),
        "got: {err}"
    );
}

#[tokio::test]
async fn zero_page_manifest_is_an_empty_edition() {
    let table = routes(vec![]);
    let addr = serve(Arc::clone(&table)).await;
    table.lock().unwrap().insert(
        manifest_path(),
        (200, "application/json".into(), manifest_body(0, addr)),
    );

    let staging = tempfile::tempdir().unwrap();
    let config = test_config(addr, RecordingStore::new(), staging.path());

    let err = deliver_edition(&config).await.unwrap_err();
    assert!(matches!(err, PaperboyError::EmptyEdition { .. }), "got: {err}");
}

#[tokio::test]
async fn malformed_manifest_is_a_parse_error() {
    let table = routes(vec![]);
    let addr = serve(Arc::clone(&table)).await;
    table.lock().unwrap().insert(
        manifest_path(),
        (200, "application/json".into(), b"this is not json".to_vec()),
    );

    let staging = tempfile::tempdir().unwrap();
    let config = test_config(addr, RecordingStore::new(), staging.path());

    let err = deliver_edition_once(&config).await.unwrap_err();
    assert!(matches!(err, PaperboyError::ManifestParse { .. }), "got: {err}");
}

/// The driver swallows every attempt error and keeps retrying; with a
/// bounded policy it surfaces the last error only after the final attempt.
#[tokio::test]
async fn unreachable_manifest_retries_until_the_attempt_cap() {
    struct CountingAttempts {
        attempts: AtomicU32,
    }
    impl JobProgressCallback for CountingAttempts {
        fn on_attempt_start(&self, _attempt: u32, _edition: &Edition) {
            self.attempts.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counter = Arc::new(CountingAttempts {
        attempts: AtomicU32::new(0),
    });
    let staging = tempfile::tempdir().unwrap();

    // Nothing listens on port 9 — every attempt fails at connect time.
    let config = JobConfig::builder()
        .base_url("http://127.0.0.1:9")
        .edition(Edition::from_id(EDITION))
        .staging_root(staging.path())
        .retry_delay(Duration::ZERO)
        .max_attempts(Some(3))
        .store(RecordingStore::new() as Arc<dyn ObjectStore>)
        .progress(Arc::clone(&counter) as Arc<dyn JobProgressCallback>)
        .build()
        .unwrap();

    let err = deliver_edition(&config).await.unwrap_err();
    assert!(matches!(err, PaperboyError::ManifestRequest { .. }), "got: {err}");
    assert_eq!(counter.attempts.load(Ordering::SeqCst), 3);
}

/// The whole point of the retry loop: an edition that appears after the
/// first failed attempt gets delivered without operator intervention.
#[tokio::test]
async fn delivers_once_the_edition_is_published() {
    let table = routes(vec![]);
    let addr = serve(Arc::clone(&table)).await;
    // Manifest starts 404 (edition not published yet); pages already exist.
    for (path, status, ctype, body) in edition_routes(2, addr) {
        if path == manifest_path() {
            continue;
        }
        table.lock().unwrap().insert(path, (status, ctype, body));
    }

    let staging = tempfile::tempdir().unwrap();
    let store = RecordingStore::new();
    let mut config = test_config(addr, Arc::clone(&store), staging.path());
    config.retry.delay = Duration::from_millis(50);
    config.retry.max_attempts = Some(10);

    let publish = {
        let table = Arc::clone(&table);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            table.lock().unwrap().insert(
                manifest_path(),
                (200, "application/json".into(), manifest_body(2, addr)),
            );
        })
    };

    let receipt = deliver_edition(&config).await.expect("delivery succeeds");
    publish.await.unwrap();

    assert!(receipt.attempts >= 2, "expected retries, got {}", receipt.attempts);
    assert_eq!(receipt.bound_pages, 2);
}

#[tokio::test]
async fn dry_run_binds_locally_and_never_touches_storage() {
    let (addr, _routes) = serve_edition(2).await;
    let staging = tempfile::tempdir().unwrap();
    let store = RecordingStore::new();
    let mut config = test_config(addr, Arc::clone(&store), staging.path());
    config.skip_upload = true;

    let receipt = deliver_edition(&config).await.expect("delivery succeeds");

    assert_eq!(receipt.uploaded, None);
    assert!(receipt.local_pdf.is_file());
    assert_eq!(pdf_page_count(&receipt.local_pdf), 2);
    assert!(store.events().is_empty(), "store must stay untouched");
}

#[tokio::test]
async fn upload_failure_fails_the_attempt() {
    let (addr, _routes) = serve_edition(1).await;
    let staging = tempfile::tempdir().unwrap();
    let config = test_config(addr, RecordingStore::failing(), staging.path());

    let err = deliver_edition_once(&config).await.unwrap_err();
    assert!(matches!(err, PaperboyError::Upload { .. }), "got: {err}");
}

#[tokio::test]
async fn staging_is_removed_unless_retained() {
    let (addr, _routes) = serve_edition(1).await;
    let staging = tempfile::tempdir().unwrap();
    let store = RecordingStore::new();
    let mut config = test_config(addr, store, staging.path());
    config.retain_staging = false;

    deliver_edition(&config).await.expect("delivery succeeds");

    assert!(
        !staging.path().join(EDITION).exists(),
        "staging directory must be cleaned up after the job"
    );
}
