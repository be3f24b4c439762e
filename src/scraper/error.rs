//! Shared error type for fetching, parsing, and cleaning.

use thiserror::Error;

/// Scraper error for HTTP, page structure, colour lookup, and cleaner setup.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    // HTTP and network
    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Optional context (e.g. "table of contents", "chapter 5") for programmatic use.
        context: Option<String>,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    // Parsing
    #[error("Missing {what} at {url} (selector or page structure may have changed).")]
    MissingData { what: String, url: String },

    #[error("Could not parse table of contents: {reason}")]
    ChapterListParse { reason: String },

    #[error("Invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    #[error("Unrecognised colour value {value:?}: expected '#' followed by 3 or 6 hex digits.")]
    InvalidColor { value: String },

    #[error("Invalid bad-text pattern: {source}")]
    CleanerPattern {
        #[from]
        source: regex::Error,
    },

    #[error("Chapter {index} has no content at {url}.")]
    EmptyChapter { index: u32, url: String },

    #[error("No chapters could be retrieved (all missing or failed).")]
    NoChaptersRetrieved,
}

impl ScraperError {
    /// Network-level failures (unreachable host, HTTP error status, truncated body).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ScraperError::Network { .. }
                | ScraperError::HttpStatus { .. }
                | ScraperError::BodyRead { .. }
        )
    }

    /// Problems confined to one chapter's page content: no content container, empty
    /// body, an unreadable colour value, or an image URL that does not resolve.
    pub fn is_chapter_content(&self) -> bool {
        matches!(
            self,
            ScraperError::MissingData { .. }
                | ScraperError::EmptyChapter { .. }
                | ScraperError::InvalidColor { .. }
                | ScraperError::InvalidUrl { .. }
        )
    }
}
