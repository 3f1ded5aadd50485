//! Bounded-concurrency fetching of a list of article URLs.
//!
//! Results are consumed in completion order. Each URL yields exactly one
//! document or one error; documents without text are dropped silently.

use super::Extractor;
use crate::error::FetchError;
use crate::models::ExtractedDocument;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Maximum number of page fetches in flight.
pub const WORKER_POOL_SIZE: usize = 5;

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Non-empty documents, in completion order.
    pub documents: Vec<ExtractedDocument>,
    /// One entry per failed URL.
    pub errors: Vec<FetchError>,
    /// Number of extractor invocations.
    pub attempted: usize,
}

impl FetchReport {
    /// All document texts joined by a blank line.
    pub fn combined_text(&self) -> String {
        self.documents.iter().map(|d| d.text.as_str()).join("\n\n")
    }
}

/// Run `extractor` over `urls`, reporting `completed / total` after each result.
#[instrument(level = "info", skip_all, fields(total = urls.len()))]
pub async fn fetch_all<E, P>(extractor: &E, urls: &[String], mut on_progress: P) -> FetchReport
where
    E: Extractor,
    P: FnMut(f64),
{
    let t0 = Instant::now();
    let total = urls.len();
    let mut report = FetchReport::default();

    let mut results = stream::iter(urls)
        .map(|url| async move { (url, extractor.extract(url).await) })
        .buffer_unordered(WORKER_POOL_SIZE);

    while let Some((url, result)) = results.next().await {
        report.attempted += 1;
        match result {
            Ok(document) if document.is_empty() => {
                warn!(%url, "Fetch produced no content");
            }
            Ok(document) => {
                debug!(%url, bytes = document.text.len(), "Fetched article");
                report.documents.push(document);
            }
            Err(e) => {
                error!(error = %e, %url, "Article fetch failed");
                report.errors.push(e);
            }
        }
        on_progress(report.attempted as f64 / total as f64);
    }

    info!(
        attempted = report.attempted,
        fetched = report.documents.len(),
        failed = report.errors.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Fetched article contents"
    );
    report
}
