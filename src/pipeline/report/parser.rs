//! Response parsing for the report service.
//!
//! Upstream LLM proxies sometimes wrap the JSON body in a markdown code
//! fence; the parser tolerates that but rejects anything that does not
//! deserialize into a complete, well-typed report.

use super::types::DocumentReport;
use super::ReportError;

/// Parse a response body into a validated [`DocumentReport`].
pub fn parse_report_response(raw: &str) -> Result<DocumentReport, ReportError> {
    let cleaned = strip_code_fence(raw).trim();
    if cleaned.is_empty() {
        return Err(ReportError::MalformedResponse("empty response body".to_string()));
    }

    let report: DocumentReport =
        serde_json::from_str(cleaned).map_err(|e| ReportError::JsonParsing(e.to_string()))?;

    if report.summary.trim().is_empty() {
        return Err(ReportError::MalformedResponse("report has an empty summary".to_string()));
    }
    Ok(report)
}

/// Cut out the content of the first ```-fence, if the body carries one.
fn strip_code_fence(raw: &str) -> &str {
    let Some(open) = raw.find("```") else {
        return raw;
    };
    let after = &raw[open + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    match after.find("```") {
        Some(close) => &after[..close],
        None => after,
    }
}
