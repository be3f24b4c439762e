//! Canonical data model for a scraped novel: volumes, chapters, and chapter bodies.
//!
//! The adapter fills this shape; the CLI serializes it as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One novel: metadata plus volumes and chapters in table-of-contents order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Novel {
    pub title: String,
    pub author: String,
    pub volumes: Vec<Volume>,
    pub chapters: Vec<Chapter>,
    /// Table-of-contents URL the novel was read from.
    #[serde(rename = "sourceUrl", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// A named group of consecutive chapters ("book" on the site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// 1-based position in the volume list.
    pub id: u32,
    pub title: String,
    #[serde(rename = "startChapter")]
    pub start_chapter: Option<u32>,
    #[serde(rename = "finalChapter")]
    pub final_chapter: Option<u32>,
    #[serde(rename = "chapterCount")]
    pub chapter_count: u32,
}

impl Volume {
    /// New volume with no chapters. Empty titles fall back to "Volume {id}".
    pub fn new(id: u32, title: &str) -> Self {
        let title = match title.trim() {
            "" => format!("Volume {}", id),
            t => t.to_string(),
        };
        Self {
            id,
            title,
            start_chapter: None,
            final_chapter: None,
            chapter_count: 0,
        }
    }

    /// Record chapter `chapter_id` as the newest member of this volume.
    /// `start_chapter` is only set the first time.
    pub fn push_chapter(&mut self, chapter_id: u32) {
        self.start_chapter.get_or_insert(chapter_id);
        self.final_chapter = Some(chapter_id);
        self.chapter_count += 1;
    }
}

/// One chapter. `id` is global across volumes; `volume` is the owning volume's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u32,
    pub url: String,
    pub title: String,
    pub volume: u32,
    /// Cleaned chapter markup (`<p>...</p>` lines). Empty until downloaded.
    #[serde(default)]
    pub body: String,
    /// Archive-relative image filename -> absolute source URL.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, String>,
}

impl Chapter {
    /// New chapter without a body. Empty titles fall back to "Chapter {id}".
    pub fn new(id: u32, url: String, title: &str, volume: u32) -> Self {
        let title = match title.trim() {
            "" => format!("Chapter {}", id),
            t => t.to_string(),
        };
        Self {
            id,
            url,
            title,
            volume,
            body: String::new(),
            images: BTreeMap::new(),
        }
    }
}
