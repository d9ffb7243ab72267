/// Application-level constants
pub const APP_NAME: &str = "docbrief";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MIME types accepted at the upload boundary
pub const MIME_PLAIN_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";
pub const ALLOWED_MIME_TYPES: [&str; 2] = [MIME_PLAIN_TEXT, MIME_PDF];

/// Maximum number of files in one batch
pub const MAX_FILES: usize = 5;

/// Maximum size of a single uploaded file (100 MB)
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Cap on the combined payload, counted in characters (not bytes)
pub const MAX_COMBINED_CHARS: usize = 3_800_000;

/// Width of the `=` rule separating framed files in the combined payload
pub const PAYLOAD_SEPARATOR_WIDTH: usize = 50;

/// Hard per-page budget for OCR; a page that exceeds it fails the batch
pub const OCR_PAGE_TIMEOUT_SECS: u64 = 120;

/// Upscale factor applied when rasterizing PDF pages for OCR.
/// Small-font scans need at least 1.5x before recognition is usable.
pub const OCR_RENDER_SCALE: f32 = 2.0;

/// Language hint forwarded to the OCR engine
pub const DEFAULT_OCR_LANGUAGE: &str = "English";

/// HTTP timeout for a single OCR request. Longer than the page budget so
/// the page-level race, not the transport, decides when to give up.
pub const OCR_HTTP_TIMEOUT_SECS: u64 = 300;

/// Minimum combined text the report service will analyze
pub const MIN_REPORT_INPUT_CHARS: usize = 50;

/// HTTP timeout for report generation
pub const REPORT_TIMEOUT_SECS: u64 = 120;

/// Reading speed used for the reading-time estimate
pub const WORDS_PER_MINUTE: u64 = 200;

/// Report service endpoint (override with DOCBRIEF_REPORT_URL)
pub fn report_service_url() -> String {
    std::env::var("DOCBRIEF_REPORT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// OCR service endpoint, Ollama-compatible (override with DOCBRIEF_OCR_URL)
pub fn ocr_service_url() -> String {
    std::env::var("DOCBRIEF_OCR_URL").unwrap_or_else(|_| "http://localhost:11434".to_string())
}

/// Vision model used for OCR (override with DOCBRIEF_OCR_MODEL)
pub fn ocr_model() -> String {
    std::env::var("DOCBRIEF_OCR_MODEL").unwrap_or_else(|_| "llama3.2-vision".to_string())
}

/// Default log filter applied when RUST_LOG is not set
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info")
}
