//! Article fetching and content extraction.
//!
//! Work is split in two:
//!
//! 1. **Extraction** ([`article`]): fetch one page and reduce its markup to
//!    cleaned text, pipe-delimited tables and a few image references
//! 2. **Batching** ([`batch`]): run the extractor over every search result
//!    with at most [`batch::WORKER_POOL_SIZE`] fetches in flight
//!
//! Failed pages are reported and skipped without failing the batch.

use crate::error::FetchError;
use crate::models::ExtractedDocument;

pub mod article;
pub mod batch;

/// Something that turns an article URL into an [`ExtractedDocument`].
///
/// [`article::ArticleExtractor`] is the HTTP implementation; tests
/// substitute canned pages.
pub trait Extractor {
    /// Fetch and clean a single page.
    async fn extract(&self, url: &str) -> Result<ExtractedDocument, FetchError>;
}
