use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::ReportError;
use crate::config;

/// Sentiment classification assigned by the report service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

/// Structured analysis of the combined document text.
///
/// Field names follow the service's wire format (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReport {
    pub summary: String,
    pub key_points: Vec<String>,
    pub insights: Vec<String>,
    pub actionable_takeaways: Vec<String>,
    pub word_count: u64,
    pub reading_time: u32,
    pub sentiment: Sentiment,
}

/// Produces a [`DocumentReport`] from combined text (allows mocking for tests)
pub trait ReportGenerator {
    fn generate(&self, text: &str) -> Result<DocumentReport, ReportError>;
}

/// Number of whitespace-separated words.
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Reading time in whole minutes, rounded up.
pub fn estimate_reading_time(word_count: u64) -> u32 {
    word_count.div_ceil(config::WORDS_PER_MINUTE) as u32
}

// ---------------------------------------------------------------------------
// Mock implementations (testing)
// ---------------------------------------------------------------------------

/// A plausible fully-populated report for tests.
pub fn sample_report() -> DocumentReport {
    DocumentReport {
        summary: "Quarterly energy usage held steady with minor seasonal variation.".to_string(),
        key_points: vec![
            "Usage peaked in January".to_string(),
            "Off-peak rates reduced costs".to_string(),
        ],
        insights: vec!["Consumption tracks heating demand".to_string()],
        actionable_takeaways: vec!["Shift laundry cycles to off-peak hours".to_string()],
        word_count: 1843,
        reading_time: 10,
        sentiment: Sentiment::Neutral,
    }
}

/// Report generator returning a canned answer and recording its input
pub struct MockReportGenerator {
    report: DocumentReport,
    fail_with: Option<String>,
    last_input: Mutex<Option<String>>,
}

impl MockReportGenerator {
    pub fn new(report: DocumentReport) -> Self {
        Self {
            report,
            fail_with: None,
            last_input: Mutex::new(None),
        }
    }

    /// Generator answering with [`sample_report`].
    pub fn sample() -> Self {
        Self::new(sample_report())
    }

    /// Generator failing every call.
    pub fn failing(message: &str) -> Self {
        let mut generator = Self::sample();
        generator.fail_with = Some(message.to_string());
        generator
    }

    /// The text passed to the most recent `generate` call.
    pub fn last_input(&self) -> Option<String> {
        self.last_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportGenerator for MockReportGenerator {
    fn generate(&self, text: &str) -> Result<DocumentReport, ReportError> {
        *self.last_input.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        if let Some(message) = &self.fail_with {
            return Err(ReportError::Api {
                status: 500,
                message: message.clone(),
            });
        }
        Ok(self.report.clone())
    }
}
