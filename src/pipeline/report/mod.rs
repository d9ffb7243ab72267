pub mod types;
pub mod parser;
pub mod client;

pub use types::*;
pub use parser::*;
pub use client::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report service is not reachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Report service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed report response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Combined text too short to analyze (minimum {0} characters)")]
    InputTooShort(usize),

    #[error("Report generation interrupted: {0}")]
    Interrupted(String),
}
