//! wanderscrape: scraper for The Wandering Inn web serial.
//!
//! Reads volumes and chapters from the table of contents, downloads chapter bodies,
//! and annotates inline colour styling with CSS3 colour names.

pub mod cli;
pub mod config;
pub mod logging;
pub mod model;
pub mod scraper;

// Re-exports for CLI and consumers.
pub use model::{Chapter, Novel, Volume};
pub use crate::scraper::wanderinginn::WanderingInnScraper;
pub use crate::scraper::{
    scrape_novel, Cleaner, ColorResolver, EmptyChapterBehavior, PoliteClient, PoliteClientBuilder,
    ScrapeOptions, Scraper, ScraperError,
};
