//! OCR fallback for documents without a usable text layer.
//!
//! Every page is rasterized, upscaled, and recognized concurrently.
//! Recognition runs on blocking threads and races a per-page timeout;
//! the first page to fail aborts the whole file, and any still-running
//! recognition is abandoned. An abandoned result can no longer reach the
//! output because page text only lands via the future's return value.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use base64::Engine as _;
use futures_util::future;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::types::{DocumentHandle, OcrEngine, ProgressSink};
use super::ExtractionError;
use crate::config;

// ──────────────────────────────────────────────
// Prompts
// ──────────────────────────────────────────────

/// System prompt for vision-model transcription.
const OCR_SYSTEM_PROMPT: &str = "\
You are a document transcription engine. Extract ALL visible text from the \
page image exactly as written, reading in natural order. Preserve line breaks \
between blocks. Output the extracted text only, with no commentary.";

fn user_prompt(language: &str) -> String {
    format!("Extract all text from this page. The document language is {language}.")
}

// ──────────────────────────────────────────────
// Status guard
// ──────────────────────────────────────────────

/// Emits `on_ocr_status(true)` on construction and `false` on drop, so the
/// OCR indicator resets on every exit path, including errors.
struct OcrStatusGuard<'a> {
    sink: &'a dyn ProgressSink,
}

impl<'a> OcrStatusGuard<'a> {
    fn engage(sink: &'a dyn ProgressSink) -> Self {
        sink.on_ocr_status(true);
        Self { sink }
    }
}

impl Drop for OcrStatusGuard<'_> {
    fn drop(&mut self) {
        self.sink.on_ocr_status(false);
    }
}

// ──────────────────────────────────────────────
// Fallback driver
// ──────────────────────────────────────────────

/// Drives OCR over every page of a document
pub struct OcrFallback {
    engine: Arc<dyn OcrEngine + Send + Sync>,
    language: String,
    page_timeout: Duration,
    render_scale: f32,
}

impl OcrFallback {
    pub fn new(engine: Arc<dyn OcrEngine + Send + Sync>) -> Self {
        Self {
            engine,
            language: config::DEFAULT_OCR_LANGUAGE.to_string(),
            page_timeout: Duration::from_secs(config::OCR_PAGE_TIMEOUT_SECS),
            render_scale: config::OCR_RENDER_SCALE,
        }
    }

    /// Override the language hint passed to the engine.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Override the per-page timeout.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Recognize every page and join the texts in page order.
    ///
    /// Page failures carry the file name and page index; the caller does
    /// not need to add context.
    pub async fn run(
        &self,
        file_name: &str,
        handle: &dyn DocumentHandle,
        sink: &dyn ProgressSink,
    ) -> Result<String, ExtractionError> {
        let total = handle.page_count();
        info!(
            file_name,
            pages = total,
            language = %self.language,
            "Text layer empty, falling back to OCR"
        );
        let _status = OcrStatusGuard::engage(sink);
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        let page_futures = (0..total).map(|page_index| async move {
            let text = self
                .recognize_page(handle, page_index)
                .await
                .map_err(|cause| (page_index, cause))?;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            sink.on_page_progress(done, total);
            Ok::<_, (usize, ExtractionError)>((page_index, text))
        });
        let results = future::try_join_all(page_futures).await.map_err(
            |(page_index, cause)| ExtractionError::OcrFailed {
                file_name: file_name.to_string(),
                page_index,
                cause: Box::new(cause),
            },
        )?;

        let mut pages: Vec<Option<String>> = vec![None; total];
        for (page_index, text) in results {
            pages[page_index] = Some(text);
        }
        Ok(pages
            .into_iter()
            .map(|p| p.unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Render one page and race recognition against the page timeout.
    async fn recognize_page(
        &self,
        handle: &dyn DocumentHandle,
        page_index: usize,
    ) -> Result<String, ExtractionError> {
        let image = handle.page(page_index)?.render(self.render_scale)?;
        let engine = Arc::clone(&self.engine);
        let language = self.language.clone();
        let started = Instant::now();

        let recognition = tokio::task::spawn_blocking(move || {
            let report = |percent: u8| {
                debug!(page_index, percent, "OCR progress");
            };
            engine.recognize_with_progress(&image, &language, &report)
        });
        match tokio::time::timeout(self.page_timeout, recognition).await {
            Err(_) => {
                warn!(
                    page_index,
                    timeout_secs = self.page_timeout.as_secs(),
                    "OCR page timed out, abandoning recognition"
                );
                Err(ExtractionError::OcrTimeout(page_index))
            }
            Ok(Err(join_error)) => Err(ExtractionError::OcrProcessing(format!(
                "OCR worker failed: {join_error}"
            ))),
            Ok(Ok(result)) => {
                debug!(
                    page_index,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "OCR page complete"
                );
                result
            }
        }
    }
}

// ──────────────────────────────────────────────
// Vision engine (Ollama-compatible HTTP)
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct VisionGenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    system: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct VisionGenerateResponse {
    response: String,
}

/// OCR engine backed by a vision model behind an Ollama-compatible API
pub struct VisionOcrEngine {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl VisionOcrEngine {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        }
    }

    /// Engine wired from environment-backed settings.
    pub fn from_config() -> Self {
        Self::new(
            &config::ocr_service_url(),
            &config::ocr_model(),
            config::OCR_HTTP_TIMEOUT_SECS,
        )
    }
}

impl OcrEngine for VisionOcrEngine {
    fn recognize(&self, image_png: &[u8], language: &str) -> Result<String, ExtractionError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = VisionGenerateRequest {
            model: &self.model,
            prompt: user_prompt(language),
            system: OCR_SYSTEM_PROMPT,
            images: vec![base64::engine::general_purpose::STANDARD.encode(image_png)],
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                ExtractionError::OcrProcessing(format!(
                    "OCR service unreachable at {}",
                    self.base_url
                ))
            } else if e.is_timeout() {
                ExtractionError::OcrProcessing(format!(
                    "OCR request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ExtractionError::OcrProcessing(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::OcrProcessing(format!(
                "OCR service returned status {status}: {body}"
            )));
        }
        let parsed: VisionGenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::OcrProcessing(format!("Invalid OCR response: {e}")))?;
        Ok(parsed.response)
    }
}

// ──────────────────────────────────────────────
// Mock implementations (testing)
// ──────────────────────────────────────────────

/// Configurable OCR engine for tests
pub struct MockOcrEngine {
    text: String,
    echo_image: bool,
    fail_with: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    languages: Mutex<Vec<String>>,
}

impl MockOcrEngine {
    /// Engine returning the same text for every page.
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            echo_image: false,
            fail_with: None,
            delay: None,
            calls: AtomicUsize::new(0),
            languages: Mutex::new(Vec::new()),
        }
    }

    /// Engine returning the page image bytes as text, so the joined output
    /// reveals page ordering.
    pub fn echoing() -> Self {
        let mut engine = Self::new("");
        engine.echo_image = true;
        engine
    }

    /// Engine failing every recognition.
    pub fn failing(reason: &str) -> Self {
        let mut engine = Self::new("");
        engine.fail_with = Some(reason.to_string());
        engine
    }

    /// Sleep before answering, for timeout tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of recognitions attempted so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Language hint of every recognition so far.
    pub fn languages(&self) -> Vec<String> {
        self.languages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, image_png: &[u8], language: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.languages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(language.to_string());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(reason) = &self.fail_with {
            return Err(ExtractionError::OcrProcessing(reason.clone()));
        }
        if self.echo_image {
            return Ok(String::from_utf8_lossy(image_png).into_owned());
        }
        Ok(self.text.clone())
    }

    fn recognize_with_progress(
        &self,
        image_png: &[u8],
        language: &str,
        on_progress: &dyn Fn(u8),
    ) -> Result<String, ExtractionError> {
        on_progress(0);
        let text = self.recognize(image_png, language)?;
        on_progress(100);
        Ok(text)
    }
}
