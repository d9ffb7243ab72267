//! Extraction orchestrator: turns a validated batch into per-file text.
//!
//! Files run strictly one at a time so memory stays bounded and failures
//! are attributable; pages inside a file run concurrently. Any failure
//! discards the whole batch; there are no partial results.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;
use uuid::Uuid;

use super::ocr::OcrFallback;
use super::text_layer::extract_text_layer;
use super::types::{DocumentBackend, FileExtractionResult, OcrEngine, ProgressSink};
use super::ExtractionError;
use crate::config;
use crate::pipeline::validate::UploadedFile;

/// Dispatches each file by MIME type and applies the OCR fallback policy.
/// Uses trait objects for the document backend and OCR engine, enabling
/// dependency injection.
pub struct DocumentExtractor {
    backend: Arc<dyn DocumentBackend + Send + Sync>,
    ocr: OcrFallback,
}

impl DocumentExtractor {
    pub fn new(
        backend: Arc<dyn DocumentBackend + Send + Sync>,
        ocr_engine: Arc<dyn OcrEngine + Send + Sync>,
    ) -> Self {
        Self {
            backend,
            ocr: OcrFallback::new(ocr_engine),
        }
    }

    /// Override the language hint passed to OCR.
    pub fn with_ocr_language(mut self, language: &str) -> Self {
        self.ocr = self.ocr.with_language(language);
        self
    }

    /// Override the per-page OCR timeout.
    pub fn with_ocr_page_timeout(mut self, timeout: Duration) -> Self {
        self.ocr = self.ocr.with_page_timeout(timeout);
        self
    }

    /// Extract text from every file, in input order.
    pub async fn extract_all(
        &self,
        files: &[UploadedFile],
        sink: &dyn ProgressSink,
    ) -> Result<Vec<FileExtractionResult>, ExtractionError> {
        let batch_id = Uuid::new_v4();
        info!(batch_id = %batch_id, files = files.len(), "Starting extraction batch");

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let text = self.extract_file(file, sink).await?;
            results.push(FileExtractionResult {
                file_name: file.name.clone(),
                text,
            });
        }
        info!(batch_id = %batch_id, files = results.len(), "Extraction batch complete");
        Ok(results)
    }

    async fn extract_file(
        &self,
        file: &UploadedFile,
        sink: &dyn ProgressSink,
    ) -> Result<String, ExtractionError> {
        let started = Instant::now();
        let raw = match file.mime_type.as_str() {
            config::MIME_PLAIN_TEXT => String::from_utf8(file.bytes.clone())
                .map_err(|e| ExtractionError::EncodingError(format!("{}: {e}", file.name)))?,
            config::MIME_PDF => self.extract_pdf(file, sink).await?,
            other => {
                return Err(ExtractionError::UnsupportedFileType(format!(
                    "{} ({other})",
                    file.name
                )))
            }
        };

        let text = raw.trim();
        if text.is_empty() {
            return Err(ExtractionError::EmptyExtraction(file.name.clone()));
        }
        info!(
            file_name = %file.name,
            chars = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "File extraction complete"
        );
        Ok(text.to_string())
    }

    async fn extract_pdf(
        &self,
        file: &UploadedFile,
        sink: &dyn ProgressSink,
    ) -> Result<String, ExtractionError> {
        let handle = self.backend.open(&file.name, &file.bytes)?;
        let text_layer = extract_text_layer(handle.as_ref(), sink).await?;
        // Any embedded text anywhere in the document settles the file;
        // OCR only runs when the whole text layer came back blank.
        if !text_layer.trim().is_empty() {
            return Ok(text_layer);
        }
        self.ocr.run(&file.name, handle.as_ref(), sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::types::{
        MockDocumentBackend, NullProgressSink, RecordingProgressSink,
    };

    fn text_file(name: &str, content: &str) -> UploadedFile {
        UploadedFile::new(name, "text/plain", content.as_bytes().to_vec())
    }

    fn pdf_file(name: &str) -> UploadedFile {
        // Bytes are opaque to the mock backend
        UploadedFile::new(name, "application/pdf", b"%PDF-1.4 mock".to_vec())
    }

    fn pages(specs: &[&[&str]]) -> Vec<Vec<String>> {
        specs
            .iter()
            .map(|fragments| fragments.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn extractor(backend: MockDocumentBackend, engine: MockOcrEngine) -> DocumentExtractor {
        DocumentExtractor::new(Arc::new(backend), Arc::new(engine))
    }

    #[tokio::test]
    async fn plain_text_returns_trimmed_content() {
        let ext = extractor(MockDocumentBackend::new(Vec::new()), MockOcrEngine::new(""));
        let files = vec![text_file("notes.txt", "  line one\nline two  \n")];

        let results = ext.extract_all(&files, &NullProgressSink).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_name, "notes.txt");
        assert_eq!(results[0].text, "line one\nline two");
    }

    #[tokio::test]
    async fn interior_whitespace_is_preserved() {
        let ext = extractor(MockDocumentBackend::new(Vec::new()), MockOcrEngine::new(""));
        let files = vec![text_file("cols.txt", "a\t\tb\n\nc")];

        let results = ext.extract_all(&files, &NullProgressSink).await.unwrap();
        assert_eq!(results[0].text, "a\t\tb\n\nc");
    }

    #[tokio::test]
    async fn invalid_utf8_fails_with_file_name() {
        let ext = extractor(MockDocumentBackend::new(Vec::new()), MockOcrEngine::new(""));
        let files = vec![UploadedFile::new(
            "latin1.txt",
            "text/plain",
            vec![0x48, 0xE9, 0x6C, 0x6C, 0x6F],
        )];

        let err = ext.extract_all(&files, &NullProgressSink).await.unwrap_err();
        match err {
            ExtractionError::EncodingError(message) => assert!(message.contains("latin1.txt")),
            other => panic!("expected EncodingError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_mime_rejected_mid_pipeline() {
        let ext = extractor(MockDocumentBackend::new(Vec::new()), MockOcrEngine::new(""));
        let files = vec![UploadedFile::new("a.docx", "application/msword", vec![1, 2])];

        let err = ext.extract_all(&files, &NullProgressSink).await.unwrap_err();
        match err {
            ExtractionError::UnsupportedFileType(message) => {
                assert!(message.contains("a.docx"));
                assert!(message.contains("application/msword"));
            }
            other => panic!("expected UnsupportedFileType, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn digital_pdf_joins_pages_in_order() {
        let backend = MockDocumentBackend::new(pages(&[&["Alpha"], &["Beta", "two"], &["Gamma"]]));
        let engine = MockOcrEngine::new("should never run");
        let ext = DocumentExtractor::new(Arc::new(backend), Arc::new(engine));
        let sink = RecordingProgressSink::new();

        let results = ext.extract_all(&[pdf_file("doc.pdf")], &sink).await.unwrap();

        assert_eq!(results[0].text, "Alpha\nBeta two\nGamma");
        assert!(sink.ocr_statuses().is_empty());
    }

    #[tokio::test]
    async fn partial_text_layer_never_triggers_ocr() {
        // Five pages with text, five scanned-blank ones
        let backend = MockDocumentBackend::new(pages(&[
            &["A"],
            &["B"],
            &["C"],
            &["D"],
            &["E"],
            &[],
            &[],
            &[],
            &[],
            &[],
        ]));
        let engine = Arc::new(MockOcrEngine::new("ocr text"));
        let ext = DocumentExtractor::new(Arc::new(backend), engine.clone());
        let sink = RecordingProgressSink::new();

        let results = ext.extract_all(&[pdf_file("half.pdf")], &sink).await.unwrap();

        assert_eq!(results[0].text, "A\nB\nC\nD\nE");
        assert_eq!(engine.call_count(), 0);
        assert!(sink.ocr_statuses().is_empty());
    }

    #[tokio::test]
    async fn blank_text_layer_falls_back_to_ocr() {
        let backend = MockDocumentBackend::scanned(3);
        let engine = Arc::new(MockOcrEngine::echoing());
        let ext = DocumentExtractor::new(Arc::new(backend), engine.clone());
        let sink = RecordingProgressSink::new();

        let results = ext.extract_all(&[pdf_file("scan.pdf")], &sink).await.unwrap();

        assert_eq!(
            results[0].text,
            "scan of page 0\nscan of page 1\nscan of page 2"
        );
        assert_eq!(engine.call_count(), 3);
        assert_eq!(sink.ocr_statuses(), vec![true, false]);
    }

    #[tokio::test]
    async fn whitespace_only_fragments_still_trigger_ocr() {
        let backend = MockDocumentBackend::new(pages(&[&["   ", "\n"], &["\t"]]));
        let engine = Arc::new(MockOcrEngine::new("recovered"));
        let ext = DocumentExtractor::new(Arc::new(backend), engine.clone());

        let results = ext
            .extract_all(&[pdf_file("blank.pdf")], &NullProgressSink)
            .await
            .unwrap();

        assert_eq!(results[0].text, "recovered\nrecovered");
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn ocr_language_override_reaches_engine() {
        let backend = MockDocumentBackend::scanned(1);
        let engine = Arc::new(MockOcrEngine::new("texte"));
        let ext = DocumentExtractor::new(Arc::new(backend), engine.clone())
            .with_ocr_language("French");

        ext.extract_all(&[pdf_file("fr.pdf")], &NullProgressSink)
            .await
            .unwrap();

        assert_eq!(engine.languages(), vec!["French"]);
    }

    #[tokio::test]
    async fn empty_plain_text_fails_empty_extraction() {
        let ext = extractor(MockDocumentBackend::new(Vec::new()), MockOcrEngine::new(""));
        let files = vec![text_file("empty.txt", "   \n\t  ")];

        let err = ext.extract_all(&files, &NullProgressSink).await.unwrap_err();
        match err {
            ExtractionError::EmptyExtraction(file_name) => assert_eq!(file_name, "empty.txt"),
            other => panic!("expected EmptyExtraction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn whitespace_ocr_output_fails_empty_extraction() {
        let backend = MockDocumentBackend::scanned(2);
        let engine = MockOcrEngine::new("   ");
        let ext = extractor(backend, engine);

        let err = ext
            .extract_all(&[pdf_file("noise.pdf")], &NullProgressSink)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyExtraction(_)));
    }

    #[tokio::test]
    async fn corrupt_pdf_open_error_propagates() {
        let backend = MockDocumentBackend::failing("bad xref table");
        let ext = extractor(backend, MockOcrEngine::new(""));

        let err = ext
            .extract_all(&[pdf_file("corrupt.pdf")], &NullProgressSink)
            .await
            .unwrap_err();
        match err {
            ExtractionError::PdfParsing(message) => assert!(message.contains("bad xref")),
            other => panic!("expected PdfParsing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_in_second_file_discards_batch() {
        let ext = extractor(MockDocumentBackend::new(Vec::new()), MockOcrEngine::new(""));
        let files = vec![
            text_file("good.txt", "fine content"),
            UploadedFile::new("bad.txt", "text/plain", vec![0xFF, 0xFE]),
        ];

        let err = ext.extract_all(&files, &NullProgressSink).await.unwrap_err();
        assert!(matches!(err, ExtractionError::EncodingError(_)));
    }

    #[tokio::test]
    async fn results_keep_input_order() {
        let backend = MockDocumentBackend::new(pages(&[&["pdf body"]]));
        let ext = extractor(backend, MockOcrEngine::new(""));
        let files = vec![
            text_file("z.txt", "zed"),
            pdf_file("m.pdf"),
            text_file("a.txt", "ay"),
        ];

        let results = ext.extract_all(&files, &NullProgressSink).await.unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["z.txt", "m.pdf", "a.txt"]);
        assert_eq!(results[0].text, "zed");
        assert_eq!(results[1].text, "pdf body");
        assert_eq!(results[2].text, "ay");
    }

    #[tokio::test]
    async fn rerun_produces_identical_output() {
        let backend = MockDocumentBackend::new(pages(&[&["stable"], &["output"]]));
        let ext = extractor(backend, MockOcrEngine::new(""));
        let files = vec![pdf_file("doc.pdf"), text_file("t.txt", "same")];

        let first = ext.extract_all(&files, &NullProgressSink).await.unwrap();
        let second = ext.extract_all(&files, &NullProgressSink).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn ocr_timeout_surfaces_through_orchestrator() {
        let backend = MockDocumentBackend::scanned(1);
        let engine = MockOcrEngine::new("late").with_delay(Duration::from_millis(250));
        let ext = extractor(backend, engine).with_ocr_page_timeout(Duration::from_millis(20));
        let sink = RecordingProgressSink::new();

        let err = ext.extract_all(&[pdf_file("slow.pdf")], &sink).await.unwrap_err();

        match err {
            ExtractionError::OcrFailed { file_name, page_index, cause } => {
                assert_eq!(file_name, "slow.pdf");
                assert_eq!(page_index, 0);
                assert!(matches!(*cause, ExtractionError::OcrTimeout(0)));
            }
            other => panic!("expected OcrFailed, got {other:?}"),
        }
        assert_eq!(sink.ocr_statuses(), vec![true, false]);
    }
}
