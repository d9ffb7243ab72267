pub mod types;
pub mod text_layer;
pub mod pdf;
pub mod ocr;
pub mod orchestrator;

pub use types::*;
pub use text_layer::*;
pub use pdf::*;
pub use ocr::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("No text could be extracted from {0}")]
    EmptyExtraction(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("OCR timed out on page {0}")]
    OcrTimeout(usize),

    #[error("OCR failed for {file_name} on page {page_index}: {cause}")]
    OcrFailed {
        file_name: String,
        page_index: usize,
        cause: Box<ExtractionError>,
    },
}
