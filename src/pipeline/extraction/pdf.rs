//! PDF document backend.
//!
//! `lopdf` parses the object tree (page list, embedded raster streams) and
//! `pdf-extract` pulls the per-page text layer from the same bytes. Both
//! are pure Rust, so opening a document never touches the filesystem or a
//! system library.

use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use super::types::{DocumentBackend, DocumentHandle, PageHandle};
use super::ExtractionError;

/// Production backend: parses PDFs fully in memory
pub struct PdfBackend;

static SHARED_BACKEND: OnceLock<Arc<PdfBackend>> = OnceLock::new();

/// Process-wide backend instance.
///
/// The first call constructs it; every later call returns the same
/// instance. Callers never need to know whether a prior call happened.
pub fn shared_backend() -> Arc<dyn DocumentBackend + Send + Sync> {
    SHARED_BACKEND.get_or_init(|| Arc::new(PdfBackend)).clone()
}

impl DocumentBackend for PdfBackend {
    fn open(&self, file_name: &str, bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, ExtractionError> {
        let document = Document::load_mem(bytes)
            .map_err(|e| ExtractionError::PdfParsing(format!("{file_name}: {e}")))?;
        let page_ids: Vec<ObjectId> = document.page_iter().collect();
        let page_texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| ExtractionError::PdfParsing(format!("{file_name}: {e}")))?;
        debug!(file_name, pages = page_ids.len(), "Opened PDF");
        Ok(Box::new(OpenedPdf {
            document,
            page_ids,
            page_texts,
        }))
    }
}

/// An opened PDF: parsed object tree plus the extracted text layer
struct OpenedPdf {
    document: Document,
    page_ids: Vec<ObjectId>,
    page_texts: Vec<String>,
}

impl DocumentHandle for OpenedPdf {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page(&self, page_index: usize) -> Result<Box<dyn PageHandle + '_>, ExtractionError> {
        if page_index >= self.page_ids.len() {
            return Err(ExtractionError::PdfParsing(format!(
                "Page {page_index} not found ({} pages)",
                self.page_ids.len()
            )));
        }
        Ok(Box::new(PdfPage {
            doc: self,
            page_index,
        }))
    }
}

struct PdfPage<'a> {
    doc: &'a OpenedPdf,
    page_index: usize,
}

impl PageHandle for PdfPage<'_> {
    fn text_fragments(&self) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract pre-joins positioned glyph runs into one block per page
        Ok(self
            .doc
            .page_texts
            .get(self.page_index)
            .map(|text| vec![text.clone()])
            .unwrap_or_default())
    }

    fn render(&self, scale: f32) -> Result<Vec<u8>, ExtractionError> {
        let page_id = self.doc.page_ids[self.page_index];
        let scan = page_scan_image(&self.doc.document, page_id)?;
        let (width, height) = scan.dimensions();
        let target_w = ((width as f32 * scale).round() as u32).max(1);
        let target_h = ((height as f32 * scale).round() as u32).max(1);
        // CatmullRom keeps glyph edges sharp without halos
        let upscaled =
            scan.resize_exact(target_w, target_h, image::imageops::FilterType::CatmullRom);

        let mut png = Cursor::new(Vec::new());
        upscaled
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
        debug!(
            page = self.page_index,
            width = target_w,
            height = target_h,
            "Rendered page scan for OCR"
        );
        Ok(png.into_inner())
    }
}

// ──────────────────────────────────────────────
// Embedded image extraction
// ──────────────────────────────────────────────

/// Decode the page's dominant raster image.
///
/// Scanned PDFs carry the whole page as one large image XObject; when a
/// page holds several (logos, stamps), the largest pixel area wins.
fn page_scan_image(doc: &Document, page_id: ObjectId) -> Result<DynamicImage, ExtractionError> {
    let stream = largest_image_stream(doc, page_id)?;
    decode_image_stream(doc, stream)
}

fn largest_image_stream<'a>(
    doc: &'a Document,
    page_id: ObjectId,
) -> Result<&'a Stream, ExtractionError> {
    let no_image =
        || ExtractionError::ImageProcessing("Page has no embedded image to OCR".to_string());

    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| ExtractionError::PdfParsing(format!("Page object unreadable: {e}")))?;
    let resources = dict_entry(doc, page, b"Resources").ok_or_else(no_image)?;
    let xobjects = dict_entry(doc, resources, b"XObject").ok_or_else(no_image)?;

    let mut best: Option<(&Stream, i64)> = None;
    for (_name, entry) in xobjects.iter() {
        let Object::Stream(stream) = deref(doc, entry) else {
            continue;
        };
        if !is_image(&stream.dict) {
            continue;
        }
        // Declared dimensions are untrusted; a stream without a plausible
        // pixel area never ranks
        let width = dict_i64(&stream.dict, b"Width").filter(|w| *w > 0);
        let height = dict_i64(&stream.dict, b"Height").filter(|h| *h > 0);
        let Some(area) = width.zip(height).and_then(|(w, h)| w.checked_mul(h)) else {
            continue;
        };
        if best.map_or(true, |(_, best_area)| area > best_area) {
            best = Some((stream, area));
        }
    }
    best.map(|(stream, _)| stream).ok_or_else(no_image)
}

/// Decode an image XObject stream.
///
/// DCTDecode streams hold a complete JPEG, and some producers embed whole
/// PNG/TIFF files; both decode directly. Anything else is treated as raw
/// 8-bit samples laid out per the stream dictionary.
fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, ExtractionError> {
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    if let Ok(decoded) = image::load_from_memory(&content) {
        return Ok(decoded);
    }
    decode_raw_pixels(doc, &stream.dict, &content)
}

fn decode_raw_pixels(
    doc: &Document,
    dict: &Dictionary,
    data: &[u8],
) -> Result<DynamicImage, ExtractionError> {
    let width = dict_i64(dict, b"Width")
        .filter(|w| *w > 0)
        .and_then(|w| u32::try_from(w).ok())
        .ok_or_else(|| {
            ExtractionError::ImageProcessing("Image stream missing usable width".to_string())
        })?;
    let height = dict_i64(dict, b"Height")
        .filter(|h| *h > 0)
        .and_then(|h| u32::try_from(h).ok())
        .ok_or_else(|| {
            ExtractionError::ImageProcessing("Image stream missing usable height".to_string())
        })?;
    let bits = dict_i64(dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(ExtractionError::ImageProcessing(format!(
            "Unsupported bit depth {bits} for raw image data"
        )));
    }

    let channels = color_channels(doc, dict);
    // u32-range dimensions can overflow the byte count on any target
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(channels as usize))
        .ok_or_else(|| {
            ExtractionError::ImageProcessing(format!("Image too large: {width}x{height}"))
        })?;
    let pixels = data
        .get(..expected)
        .ok_or_else(|| {
            ExtractionError::ImageProcessing(format!(
                "Image data truncated: {} bytes, need {expected}",
                data.len()
            ))
        })?
        .to_vec();

    let image = match channels {
        1 => image::GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        // 4-channel covers CMYK scans; recognition does not need faithful color
        4 => image::RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
        other => {
            return Err(ExtractionError::ImageProcessing(format!(
                "Unsupported channel count {other}"
            )))
        }
    };
    image.ok_or_else(|| ExtractionError::ImageProcessing("Pixel buffer size mismatch".to_string()))
}

/// Samples per pixel implied by the color space. ICCBased spaces carry an
/// explicit /N; anything unrecognized falls back to RGB.
fn color_channels(doc: &Document, dict: &Dictionary) -> u32 {
    let Some(space) = dict.get(b"ColorSpace").ok().map(|o| deref(doc, o)) else {
        return 3;
    };
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => 1,
            b"DeviceRGB" | b"CalRGB" => 3,
            b"DeviceCMYK" => 4,
            _ => 3,
        },
        Object::Array(entries) => match entries.first().map(|o| deref(doc, o)) {
            Some(Object::Name(name)) if name.as_slice() == b"ICCBased" => entries
                .get(1)
                .map(|o| deref(doc, o))
                .and_then(|o| match o {
                    Object::Stream(s) => dict_i64(&s.dict, b"N"),
                    _ => None,
                })
                .map(|n| n.clamp(1, 4) as u32)
                .unwrap_or(3),
            Some(Object::Name(name)) if name.as_slice() == b"Indexed" => 1,
            _ => 3,
        },
        _ => 3,
    }
}

fn is_image(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image")
}

/// Follow reference indirection to the pointed-at object.
fn deref<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc
            .get_object(*id)
            .map(|target| deref(doc, target))
            .unwrap_or(object),
        other => other,
    }
}

/// Dictionary entry resolved through any reference indirection.
fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    match deref(doc, dict.get(key).ok()?) {
        Object::Dictionary(entry) => Some(entry),
        _ => None,
    }
}

fn dict_i64(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match dict.get(key).ok()? {
        Object::Integer(value) => Some(*value),
        _ => None,
    }
}
