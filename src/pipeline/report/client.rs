//! HTTP client for the hosted report-generation service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::parser::parse_report_response;
use super::types::{DocumentReport, ReportGenerator};
use super::ReportError;
use crate::config;

#[derive(Serialize)]
struct GenerateReportRequest<'a> {
    text: &'a str,
}

/// Body shape the service uses for non-2xx answers
#[derive(Deserialize)]
struct ServiceErrorBody {
    error: String,
}

/// Blocking client for `POST /api/generate-report`
pub struct HttpReportGenerator {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpReportGenerator {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Client wired from environment-backed settings.
    pub fn from_config() -> Self {
        Self::new(&config::report_service_url(), config::REPORT_TIMEOUT_SECS)
    }
}

impl ReportGenerator for HttpReportGenerator {
    fn generate(&self, text: &str) -> Result<DocumentReport, ReportError> {
        if text.trim().chars().count() < config::MIN_REPORT_INPUT_CHARS {
            return Err(ReportError::InputTooShort(config::MIN_REPORT_INPUT_CHARS));
        }

        let url = format!("{}/api/generate-report", self.base_url);
        debug!(chars = text.len(), "Requesting report generation");

        let response = self
            .client
            .post(&url)
            .json(&GenerateReportRequest { text })
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ReportError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    ReportError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    ReportError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            // The service reports failures as {"error": "..."}
            let message = serde_json::from_str::<ServiceErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(ReportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .map_err(|e| ReportError::HttpClient(e.to_string()))?;
        let report = parse_report_response(&body)?;
        info!(
            word_count = report.word_count,
            sentiment = report.sentiment.as_str(),
            "Report received"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let generator = HttpReportGenerator::new("http://localhost:3000/", 30);
        assert_eq!(generator.base_url, "http://localhost:3000");
        assert_eq!(generator.timeout_secs, 30);
    }

    #[test]
    fn request_body_matches_wire_format() {
        let body = GenerateReportRequest { text: "hello" };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"text":"hello"}"#);
    }

    #[test]
    fn short_input_rejected_before_any_request() {
        // Port 1 would refuse instantly, but the guard fires first
        let generator = HttpReportGenerator::new("http://127.0.0.1:1", 5);
        let err = generator.generate("too short").unwrap_err();
        assert!(matches!(err, ReportError::InputTooShort(50)));
    }

    #[test]
    fn whitespace_padding_does_not_satisfy_minimum() {
        let generator = HttpReportGenerator::new("http://127.0.0.1:1", 5);
        let padded = format!("tiny{}", " ".repeat(100));
        let err = generator.generate(&padded).unwrap_err();
        assert!(matches!(err, ReportError::InputTooShort(_)));
    }

    #[test]
    fn interior_whitespace_counts_toward_minimum() {
        let generator = HttpReportGenerator::new("http://127.0.0.1:1", 2);
        // 26 letters joined by single spaces: 51 chars after trimming
        let spaced = ('a'..='z').map(String::from).collect::<Vec<_>>().join(" ");
        match generator.generate(&spaced).unwrap_err() {
            ReportError::Connection(_) | ReportError::HttpClient(_) => {}
            other => panic!("expected a transport error, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_service_maps_to_transport_error() {
        let generator = HttpReportGenerator::new("http://127.0.0.1:1", 2);
        let text = "x".repeat(80);
        let err = generator.generate(&text).unwrap_err();
        match err {
            ReportError::Connection(_) | ReportError::HttpClient(_) => {}
            other => panic!("expected a transport error, got {other:?}"),
        }
    }
}
