//! Embedded text-layer extraction.
//!
//! All pages of a document are read concurrently; results land in
//! index-keyed slots so the final join is always in page order no matter
//! which page finished first.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future;
use tracing::debug;

use super::types::{DocumentHandle, ProgressSink};
use super::ExtractionError;

/// Join a page's text fragments: trim each, drop the empty ones, then
/// separate with single spaces.
pub fn join_fragments(fragments: &[String]) -> String {
    fragments
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read the text layer of every page and join pages with newlines.
///
/// Returns a whitespace-only string when the document has no embedded
/// text; the caller decides whether that means falling back to OCR.
pub async fn extract_text_layer(
    handle: &dyn DocumentHandle,
    sink: &dyn ProgressSink,
) -> Result<String, ExtractionError> {
    let total = handle.page_count();
    let completed = AtomicUsize::new(0);
    let completed = &completed;

    let page_futures = (0..total).map(|page_index| async move {
        let fragments = handle.page(page_index)?.text_fragments()?;
        let text = join_fragments(&fragments);
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        sink.on_page_progress(done, total);
        Ok::<_, ExtractionError>((page_index, text))
    });
    let results = future::try_join_all(page_futures).await?;

    let mut pages: Vec<Option<String>> = vec![None; total];
    for (page_index, text) in results {
        pages[page_index] = Some(text);
    }
    debug!(pages = total, "Text layer pass complete");

    Ok(pages
        .into_iter()
        .map(|p| p.unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n"))
}
