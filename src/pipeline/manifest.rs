//! Manifest stage: fetch and parse the edition's page listing.
//!
//! The reader service describes each edition as a JSON document of the shape
//! `{"document": {"pages": [{"imageUri": "host/path/page1.jpg"}, ...]}}`.
//! Page order in this array is authoritative: the Nth descriptor becomes
//! staged file N and PDF page N, and descriptor 1 is the cover.
//!
//! The body is read fully before parsing (manifests are a few kilobytes) and
//! parsed with `serde_json` into typed structs rather than probed as a
//! dynamic value, so a malformed feed fails loudly here instead of deep in
//! the pages stage.

use crate::edition::Edition;
use crate::error::PaperboyError;
use serde::Deserialize;
use tracing::{debug, info};

/// The edition manifest as served by the reader endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub document: EditionDocument,
}

/// The document body: an ordered list of page descriptors.
#[derive(Debug, Clone, Deserialize)]
pub struct EditionDocument {
    pub pages: Vec<PageDescriptor>,
}

/// One page of the edition.
#[derive(Debug, Clone, Deserialize)]
pub struct PageDescriptor {
    /// Host-and-path image location, scheme-less in the current feed.
    #[serde(rename = "imageUri")]
    pub image_uri: String,
}

impl Manifest {
    pub fn page_count(&self) -> usize {
        self.document.pages.len()
    }
}

impl PageDescriptor {
    /// Full URL of the page image.
    ///
    /// The feed serves scheme-less `host/path` strings over plain HTTP; a
    /// descriptor that already carries a scheme is passed through untouched
    /// so a future feed migration to absolute URLs keeps working.
    pub fn image_url(&self) -> String {
        if self.image_uri.starts_with("http://") || self.image_uri.starts_with("https://") {
            self.image_uri.clone()
        } else {
            format!("http://{}", self.image_uri)
        }
    }
}

/// Fetch and parse the manifest for an edition.
///
/// Exactly one GET, no retry — the job driver owns retries. Transport
/// failures and non-success statuses map to request errors; a body that is
/// not the expected JSON shape maps to a parse error.
pub async fn fetch_manifest(
    client: &reqwest::Client,
    url: &str,
    edition: &Edition,
) -> Result<Manifest, PaperboyError> {
    info!("Fetching manifest for {} from {}", edition, url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PaperboyError::ManifestRequest {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(PaperboyError::ManifestStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| PaperboyError::ManifestRequest {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let manifest: Manifest =
        serde_json::from_slice(&body).map_err(|source| PaperboyError::ManifestParse {
            url: url.to_string(),
            source,
        })?;

    debug!("Manifest lists {} pages", manifest.page_count());
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reader_shape() {
        let body = r#"{
            "document": {
                "pages": [
                    {"imageUri": "image.isu.pub/240305/page_1.jpg"},
                    {"imageUri": "image.isu.pub/240305/page_2.jpg"}
                ]
            }
        }"#;
        let manifest: Manifest = serde_json::from_str(body).unwrap();
        assert_eq!(manifest.page_count(), 2);
        assert_eq!(
            manifest.document.pages[0].image_uri,
            "image.isu.pub/240305/page_1.jpg"
        );
    }

    #[test]
    fn tolerates_extra_fields() {
        // The live feed carries plenty of metadata we never read.
        let body = r#"{
            "document": {
                "pageCount": 1,
                "publicationId": "abc",
                "pages": [{"imageUri": "host/p1.jpg", "width": 1200, "height": 1700}]
            },
            "viewer": "reader3"
        }"#;
        let manifest: Manifest = serde_json::from_str(body).unwrap();
        assert_eq!(manifest.page_count(), 1);
    }

    #[test]
    fn empty_pages_array_parses() {
        let manifest: Manifest =
            serde_json::from_str(r#"{"document": {"pages": []}}"#).unwrap();
        assert_eq!(manifest.page_count(), 0);
    }

    #[test]
    fn image_url_prepends_plain_http() {
        let page = PageDescriptor {
            image_uri: "image.isu.pub/240305/page_1.jpg".into(),
        };
        assert_eq!(
            page.image_url(),
            "http://image.isu.pub/240305/page_1.jpg"
        );
    }

    #[test]
    fn image_url_keeps_existing_scheme() {
        let page = PageDescriptor {
            image_uri: "https://cdn.example/page_1.jpg".into(),
        };
        assert_eq!(page.image_url(), "https://cdn.example/page_1.jpg");
    }
}
