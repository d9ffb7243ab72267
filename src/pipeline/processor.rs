//! Single entry point that drives the full document pipeline:
//! validate → extract → combine → report.
//!
//! Uses trait-based DI for the document backend, OCR engine, and report
//! generator, so the whole flow is testable with mock implementations.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::extraction::orchestrator::DocumentExtractor;
use super::extraction::types::ProgressSink;
use super::payload::build_combined_payload;
use super::report::types::{count_words, estimate_reading_time, DocumentReport, ReportGenerator};
use super::report::ReportError;
use super::validate::{validate, UploadedFile};
use super::ProcessingError;
use crate::config;

/// Outcome of a full pipeline run
#[derive(Debug, Clone)]
pub struct ProcessedBatch {
    pub report: DocumentReport,
    pub file_count: usize,
    /// Characters actually submitted to the report service.
    pub submitted_chars: usize,
    pub truncated: bool,
}

/// Orchestrates the batch pipeline end to end
pub struct ReportPipeline {
    extractor: DocumentExtractor,
    generator: Arc<dyn ReportGenerator + Send + Sync>,
}

impl ReportPipeline {
    pub fn new(
        extractor: DocumentExtractor,
        generator: Arc<dyn ReportGenerator + Send + Sync>,
    ) -> Self {
        Self { extractor, generator }
    }

    /// Run the full pipeline over one batch of uploaded files.
    ///
    /// Fails fast: the first error at any stage discards the batch.
    pub async fn process(
        &self,
        files: &[UploadedFile],
        sink: &dyn ProgressSink,
    ) -> Result<ProcessedBatch, ProcessingError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(run_id = %run_id, files = files.len(), "Pipeline run started");

        validate(files)?;
        let results = self.extractor.extract_all(files, sink).await?;
        let payload = build_combined_payload(&results);
        if payload.truncated {
            warn!(
                run_id = %run_id,
                original_chars = payload.total_chars,
                "Combined text truncated before analysis"
            );
        }

        let submitted_chars = payload.text.chars().count();
        let submitted_words = count_words(&payload.text);
        let report = self.generate_report(payload.text).await?;
        // The service computes its own statistics; local figures are kept
        // alongside for diagnosis when the two drift apart.
        debug!(
            run_id = %run_id,
            reported_words = report.word_count,
            counted_words = submitted_words,
            estimated_minutes = estimate_reading_time(submitted_words),
            "Local text statistics"
        );

        info!(
            run_id = %run_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            word_count = report.word_count,
            "Pipeline run complete"
        );
        Ok(ProcessedBatch {
            report,
            file_count: results.len(),
            submitted_chars,
            truncated: payload.truncated,
        })
    }

    /// The generator blocks on HTTP, so it runs off the async runtime.
    async fn generate_report(&self, text: String) -> Result<DocumentReport, ReportError> {
        let generator = Arc::clone(&self.generator);
        tokio::task::spawn_blocking(move || generator.generate(&text))
            .await
            .map_err(|e| ReportError::Interrupted(e.to_string()))?
    }
}

/// Wire the production pipeline: shared PDF backend, vision OCR engine,
/// HTTP report client.
pub fn build_pipeline() -> ReportPipeline {
    let backend = super::extraction::pdf::shared_backend();
    let ocr_engine = Arc::new(super::extraction::ocr::VisionOcrEngine::from_config());
    let generator = Arc::new(super::report::client::HttpReportGenerator::from_config());
    info!(
        report_url = %config::report_service_url(),
        ocr_url = %config::ocr_service_url(),
        ocr_model = %config::ocr_model(),
        "Pipeline assembled"
    );
    ReportPipeline::new(DocumentExtractor::new(backend, ocr_engine), generator)
}
