pub mod validate;
pub mod extraction;
pub mod payload;
pub mod report;
pub mod processor; // Batch pipeline entry point

pub use processor::*;

use thiserror::Error;

use self::extraction::ExtractionError;
use self::report::ReportError;
use self::validate::ValidationError;

/// Errors that can occur while processing a batch
#[derive(Error, Debug)]
pub enum ProcessingError {
    // Validation messages are user-facing and pass through verbatim
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),
}
