//! Combined-payload assembly.
//!
//! Per-file results are framed with their file name, joined with a fixed
//! separator rule, and capped at a character budget sized for the report
//! service's context window. Truncation counts characters, not bytes, so
//! multibyte text is never split mid-character.

use tracing::warn;

use crate::config::{MAX_COMBINED_CHARS, PAYLOAD_SEPARATOR_WIDTH};
use crate::pipeline::extraction::types::FileExtractionResult;

/// The single text blob submitted for analysis
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedPayload {
    pub text: String,
    /// Character count before any truncation.
    pub total_chars: usize,
    pub truncated: bool,
}

/// Frame each file's text under its name and join with separator rules.
pub fn build_combined_payload(results: &[FileExtractionResult]) -> CombinedPayload {
    let separator = format!("\n\n{}\n\n", "=".repeat(PAYLOAD_SEPARATOR_WIDTH));
    let combined = results
        .iter()
        .map(|r| format!("=== {} ===\n\n{}", r.file_name, r.text))
        .collect::<Vec<_>>()
        .join(&separator);

    let total_chars = combined.chars().count();
    if total_chars <= MAX_COMBINED_CHARS {
        return CombinedPayload {
            text: combined,
            total_chars,
            truncated: false,
        };
    }

    warn!(
        total_chars,
        cap = MAX_COMBINED_CHARS,
        "Combined text exceeds cap, truncating"
    );
    CombinedPayload {
        text: combined.chars().take(MAX_COMBINED_CHARS).collect(),
        total_chars,
        truncated: true,
    }
}
