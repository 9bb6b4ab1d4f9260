//! Bind stage: staged page images → one A4 PDF.
//!
//! Every staged JPEG becomes a single full-bleed plate on an A4 page
//! (210 × 297 mm), stretched to fill — newspaper scans are already
//! near-A4-proportioned, so the distortion is invisible and a uniform page
//! size keeps the bound paper printable.
//!
//! ## Why spawn_blocking?
//!
//! printpdf decodes every JPEG and serialises the whole document
//! synchronously. Running that on the async runtime would stall the worker
//! thread for seconds on a thick edition; `tokio::task::spawn_blocking`
//! moves it to the blocking pool, same as any other CPU-bound stage.
//!
//! ## Zero pages
//!
//! Binding an empty page list is an error. A PDF with no pages is not
//! representable here, and an edition that lost every page is a broken
//! publication the retry loop should take another run at.

use crate::edition::Edition;
use crate::error::PaperboyError;
use crate::report::StagedPage;
use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// International A4 in millimetres.
const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;

/// DPI the plates are placed at before scaling to the page edge.
const PLACEMENT_DPI: f32 = 300.0;

/// Bind the staged pages, in order, into a PDF at `output`.
///
/// Returns the output path on success. The first unreadable image or write
/// failure aborts the whole binding — there is no per-page recovery at this
/// stage; a bad staged file means the attempt itself is bad.
pub async fn bind_pdf(
    pages: &[StagedPage],
    output: &Path,
    edition: &Edition,
) -> Result<PathBuf, PaperboyError> {
    let pages = pages.to_vec();
    let output = output.to_path_buf();
    let edition = edition.clone();

    tokio::task::spawn_blocking(move || bind_blocking(&pages, &output, &edition))
        .await
        .map_err(|e| PaperboyError::Internal(format!("bind task panicked: {e}")))?
}

/// Blocking implementation of the binding.
fn bind_blocking(
    pages: &[StagedPage],
    output: &Path,
    edition: &Edition,
) -> Result<PathBuf, PaperboyError> {
    if pages.is_empty() {
        return Err(PaperboyError::EmptyEdition {
            edition: edition.to_string(),
        });
    }

    let (doc, first_page, first_layer) = PdfDocument::new(
        edition.as_str(),
        Mm(A4_WIDTH_MM),
        Mm(A4_HEIGHT_MM),
        "plate",
    );

    let mut slots = vec![(first_page, first_layer)];
    for _ in 1..pages.len() {
        slots.push(doc.add_page(Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), "plate"));
    }

    for (staged, (page_idx, layer_idx)) in pages.iter().zip(slots) {
        let file = File::open(&staged.path).map_err(|e| PaperboyError::ImageRead {
            path: staged.path.clone(),
            detail: e.to_string(),
        })?;
        let mut reader = BufReader::new(file);
        let decoder = JpegDecoder::new(&mut reader).map_err(|e| PaperboyError::ImageRead {
            path: staged.path.clone(),
            detail: e.to_string(),
        })?;
        let image = Image::try_from(decoder).map_err(|e| PaperboyError::ImageRead {
            path: staged.path.clone(),
            detail: e.to_string(),
        })?;

        let transform = plate_transform(image.image.width.0, image.image.height.0);
        debug!(
            "Embedding page {} ({}x{} px)",
            staged.page_num, image.image.width.0, image.image.height.0
        );
        image.add_to_layer(doc.get_page(page_idx).get_layer(layer_idx), transform);
    }

    let file = File::create(output).map_err(|e| PaperboyError::PdfWrite {
        path: output.to_path_buf(),
        detail: e.to_string(),
    })?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| PaperboyError::PdfWrite {
            path: output.to_path_buf(),
            detail: e.to_string(),
        })?;

    info!("Bound {} pages into {}", pages.len(), output.display());
    Ok(output.to_path_buf())
}

/// Transform that stretches an image of the given pixel size to fill A4.
///
/// printpdf places an image at its native size for the given DPI; the scale
/// factors are the ratio between the A4 edge and that native size, so the
/// plate covers the page exactly regardless of the scan resolution.
fn plate_transform(width_px: usize, height_px: usize) -> ImageTransform {
    let native_w_mm = width_px as f32 * 25.4 / PLACEMENT_DPI;
    let native_h_mm = height_px as f32 * 25.4 / PLACEMENT_DPI;

    ImageTransform {
        translate_x: Some(Mm(0.0)),
        translate_y: Some(Mm(0.0)),
        scale_x: Some(A4_WIDTH_MM / native_w_mm),
        scale_y: Some(A4_HEIGHT_MM / native_h_mm),
        dpi: Some(PLACEMENT_DPI),
        ..Default::default()
    }
}
