use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ExtractionError;

/// Extracted text of a single file, keyed by its original name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileExtractionResult {
    pub file_name: String,
    pub text: String,
}

/// Snapshot of extraction progress, updated as pages complete
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionProgress {
    pub current_page: usize,
    pub total_pages: usize,
    pub ocr_active: bool,
}

/// Read access to an opened document (allows mocking for tests)
pub trait DocumentHandle {
    fn page_count(&self) -> usize;

    fn page(&self, page_index: usize) -> Result<Box<dyn PageHandle + '_>, ExtractionError>;
}

/// One page of an opened document
pub trait PageHandle {
    /// Embedded text-layer fragments in reading order. Empty for scanned pages.
    fn text_fragments(&self) -> Result<Vec<String>, ExtractionError>;

    /// Rasterize the page at the given scale factor and encode as PNG.
    fn render(&self, scale: f32) -> Result<Vec<u8>, ExtractionError>;
}

/// Parses document bytes into paged handles
pub trait DocumentBackend {
    fn open(&self, file_name: &str, bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, ExtractionError>;
}

/// Character recognition over a rendered page image (allows mocking for tests)
pub trait OcrEngine {
    fn recognize(&self, image_png: &[u8], language: &str) -> Result<String, ExtractionError>;

    /// Like [`recognize`](Self::recognize) but reports completion percentage
    /// along the way. Engines without incremental progress use the default.
    fn recognize_with_progress(
        &self,
        image_png: &[u8],
        language: &str,
        on_progress: &dyn Fn(u8),
    ) -> Result<String, ExtractionError> {
        let text = self.recognize(image_png, language)?;
        on_progress(100);
        Ok(text)
    }
}

/// Receives progress callbacks during extraction
pub trait ProgressSink {
    /// OCR fallback engaged (`true`) or finished/aborted (`false`).
    fn on_ocr_status(&self, active: bool);

    /// `completed` pages done out of `total` for the current file.
    fn on_page_progress(&self, completed: usize, total: usize);
}

/// Sink that discards all progress updates
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_ocr_status(&self, _active: bool) {}

    fn on_page_progress(&self, _completed: usize, _total: usize) {}
}

/// Production sink: keeps the latest snapshot and logs transitions
pub struct LoggingProgressSink {
    state: Mutex<ExtractionProgress>,
}

impl LoggingProgressSink {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ExtractionProgress::default()),
        }
    }

    /// Latest progress snapshot.
    pub fn snapshot(&self) -> ExtractionProgress {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for LoggingProgressSink {
    fn on_ocr_status(&self, active: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.ocr_active = active;
        if active {
            info!("No text layer found, OCR engaged");
        } else {
            info!("OCR finished");
        }
    }

    fn on_page_progress(&self, completed: usize, total: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current_page = completed;
        state.total_pages = total;
        info!(completed, total, "Page processed");
    }
}

// ---------------------------------------------------------------------------
// Mock implementations (testing)
// ---------------------------------------------------------------------------

/// Progress event captured by [`RecordingProgressSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    OcrStatus(bool),
    Page { completed: usize, total: usize },
}

/// Sink that records every callback for later assertions
pub struct RecordingProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// OCR status transitions in emission order.
    pub fn ocr_statuses(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::OcrStatus(active) => Some(active),
                _ => None,
            })
            .collect()
    }

    /// `(completed, total)` pairs in emission order.
    pub fn page_events(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Page { completed, total } => Some((completed, total)),
                _ => None,
            })
            .collect()
    }
}

impl Default for RecordingProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn on_ocr_status(&self, active: bool) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ProgressEvent::OcrStatus(active));
    }

    fn on_page_progress(&self, completed: usize, total: usize) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ProgressEvent::Page { completed, total });
    }
}

/// In-memory document backend with configurable pages
pub struct MockDocumentBackend {
    pages: Vec<Vec<String>>,
    fail_open: Option<String>,
    render_failure: Option<usize>,
    render_log: Arc<Mutex<Vec<(usize, f32)>>>,
}

impl MockDocumentBackend {
    /// Document whose pages carry the given text-layer fragments.
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        Self {
            pages,
            fail_open: None,
            render_failure: None,
            render_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Document of `page_count` pages with no text layer at all.
    pub fn scanned(page_count: usize) -> Self {
        Self::new(vec![Vec::new(); page_count])
    }

    /// Backend whose `open` always fails.
    pub fn failing(reason: &str) -> Self {
        let mut backend = Self::new(Vec::new());
        backend.fail_open = Some(reason.to_string());
        backend
    }

    /// Make rendering of one page fail.
    pub fn with_render_failure(mut self, page_index: usize) -> Self {
        self.render_failure = Some(page_index);
        self
    }

    /// `(page_index, scale)` of every render call so far.
    pub fn rendered(&self) -> Vec<(usize, f32)> {
        self.render_log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl DocumentBackend for MockDocumentBackend {
    fn open(&self, _file_name: &str, _bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, ExtractionError> {
        if let Some(reason) = &self.fail_open {
            return Err(ExtractionError::PdfParsing(reason.clone()));
        }
        Ok(Box::new(MockDocumentHandle {
            pages: self.pages.clone(),
            render_failure: self.render_failure,
            render_log: Arc::clone(&self.render_log),
        }))
    }
}

/// Handle produced by [`MockDocumentBackend`]
pub struct MockDocumentHandle {
    pages: Vec<Vec<String>>,
    render_failure: Option<usize>,
    render_log: Arc<Mutex<Vec<(usize, f32)>>>,
}

impl MockDocumentHandle {
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        Self {
            pages,
            render_failure: None,
            render_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl DocumentHandle for MockDocumentHandle {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, page_index: usize) -> Result<Box<dyn PageHandle + '_>, ExtractionError> {
        let fragments = self.pages.get(page_index).ok_or_else(|| {
            ExtractionError::PdfParsing(format!(
                "Page {page_index} not found ({} pages)",
                self.pages.len()
            ))
        })?;
        Ok(Box::new(MockPage {
            fragments: fragments.clone(),
            page_index,
            fail_render: self.render_failure == Some(page_index),
            render_log: Arc::clone(&self.render_log),
        }))
    }
}

struct MockPage {
    fragments: Vec<String>,
    page_index: usize,
    fail_render: bool,
    render_log: Arc<Mutex<Vec<(usize, f32)>>>,
}

impl PageHandle for MockPage {
    fn text_fragments(&self) -> Result<Vec<String>, ExtractionError> {
        Ok(self.fragments.clone())
    }

    fn render(&self, scale: f32) -> Result<Vec<u8>, ExtractionError> {
        if self.fail_render {
            return Err(ExtractionError::ImageProcessing(format!(
                "Mock render failure on page {}",
                self.page_index
            )));
        }
        self.render_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((self.page_index, scale));
        // The byte content names the page so echo-style OCR mocks can
        // verify ordering.
        Ok(format!("scan of page {}", self.page_index).into_bytes())
    }
}
