//! Site adapter, scraper trait, shared client, and the chapter download loop.

mod client;
mod error;

pub mod cleaner;
pub mod colors;
pub mod markup;
pub mod wanderinginn;

pub use cleaner::Cleaner;
pub use client::{PoliteClient, PoliteClientBuilder};
pub use colors::ColorResolver;
pub use error::ScraperError;

use crate::model::{Chapter, Novel};
use markup::escape_attr;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::{info, warn};

/// Parse a CSS selector or return a selector error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, ScraperError> {
    Selector::parse(sel).map_err(|e| ScraperError::Selector {
        selector: sel.to_string(),
        message: e.to_string(),
    })
}

/// How to handle a chapter whose content cannot be used (see [`ScraperError::is_chapter_content`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyChapterBehavior {
    /// Skip the chapter (default).
    Skip,
    /// Include a placeholder chapter (title and body indicating no content).
    Placeholder,
    /// Fail the scrape.
    Fail,
}

/// Options for a scrape run: progress callback, chapter range, empty-chapter handling, toc-only.
#[derive(Default)]
pub struct ScrapeOptions<'a> {
    pub progress: Option<&'a dyn Fn(u32, u32)>,
    /// 1-based inclusive chapter range.
    pub chapter_range: Option<(u32, u32)>,
    /// How to handle unusable chapter content (default Skip).
    pub empty_chapter_behavior: Option<EmptyChapterBehavior>,
    pub toc_only: bool,
}

/// Trait implemented by site adapters.
///
/// [`scrape_novel`] calls `read_novel_info` once, then `download_chapter_body` and
/// `extract_chapter_images` for every selected chapter.
pub trait Scraper {
    /// Read title, author, volumes, and chapters (without bodies) from the table of contents.
    fn read_novel_info(&mut self) -> Result<Novel, ScraperError>;

    /// Fetch one chapter page and return its cleaned body.
    fn download_chapter_body(&mut self, chapter: &Chapter) -> Result<String, ScraperError>;

    /// Post-process the body once it is assigned. Default: [`rewrite_chapter_images`].
    fn extract_chapter_images(&mut self, chapter: &mut Chapter) -> Result<(), ScraperError> {
        rewrite_chapter_images(chapter)
    }
}

/// Resolve every `<img src>` in the chapter body against the chapter URL, record it in
/// `chapter.images`, and point the `src` at `images/<name>`.
pub fn rewrite_chapter_images(chapter: &mut Chapter) -> Result<(), ScraperError> {
    let srcs: Vec<String> = {
        let fragment = Html::parse_fragment(&chapter.body);
        let img_sel = parse_selector("img[src]")?;
        fragment
            .select(&img_sel)
            .filter_map(|img| img.value().attr("src"))
            .filter(|src| !src.starts_with("images/"))
            .map(String::from)
            .collect()
    };
    if srcs.is_empty() {
        return Ok(());
    }

    let base = Url::parse(&chapter.url).map_err(|e| ScraperError::InvalidUrl {
        input: chapter.url.clone(),
        reason: e.to_string(),
    })?;
    let mut names: HashMap<String, String> = HashMap::new();
    for src in srcs {
        if names.contains_key(&src) {
            continue;
        }
        let absolute = base.join(&src).map_err(|e| ScraperError::InvalidUrl {
            input: src.clone(),
            reason: e.to_string(),
        })?;
        let name = format!(
            "{:05}_{:02}.{}",
            chapter.id,
            names.len() + 1,
            image_extension(&absolute)
        );
        chapter.images.insert(name.clone(), absolute.to_string());
        chapter.body = chapter.body.replace(
            &format!("src=\"{}\"", escape_attr(&src)),
            &format!("src=\"images/{}\"", name),
        );
        names.insert(src, name);
    }
    Ok(())
}

/// Extension from the last path segment when it looks like one; "jpg" otherwise.
fn image_extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}

/// Run a full scrape: table of contents, then each selected chapter.
///
/// Content problems in a single chapter (see [`ScraperError::is_chapter_content`]) follow
/// [`EmptyChapterBehavior`]; network failures for a single chapter are logged and the
/// chapter is skipped. Anything else aborts.
pub fn scrape_novel(
    scraper: &mut dyn Scraper,
    options: &ScrapeOptions<'_>,
) -> Result<Novel, ScraperError> {
    let mut novel = scraper.read_novel_info()?;
    if let Some((from, to)) = options.chapter_range {
        novel.chapters.retain(|c| c.id >= from && c.id <= to);
    }
    if options.toc_only {
        return Ok(novel);
    }

    let behavior = options
        .empty_chapter_behavior
        .unwrap_or(EmptyChapterBehavior::Skip);
    let pending = std::mem::take(&mut novel.chapters);
    let total = pending.len() as u32;
    for (done, mut chapter) in pending.into_iter().enumerate() {
        if let Some(progress) = options.progress {
            progress(done as u32 + 1, total);
        }

        let outcome = scraper.download_chapter_body(&chapter).and_then(|body| {
            if body.trim().is_empty() {
                Err(ScraperError::EmptyChapter {
                    index: chapter.id,
                    url: chapter.url.clone(),
                })
            } else {
                Ok(body)
            }
        });
        let outcome = outcome.and_then(|body| {
            chapter.body = body;
            scraper.extract_chapter_images(&mut chapter)
        });
        match outcome {
            Ok(()) => novel.chapters.push(chapter),
            Err(e) if e.is_chapter_content() => match behavior {
                EmptyChapterBehavior::Skip => {
                    warn!(chapter = chapter.id, url = %chapter.url, error = %e, "skipped chapter");
                }
                EmptyChapterBehavior::Placeholder => {
                    warn!(chapter = chapter.id, url = %chapter.url, error = %e, "placeholder for chapter");
                    chapter.title = format!("{} (no content)", chapter.title);
                    chapter.body = "<p>This chapter returned no content.</p>".to_string();
                    chapter.images.clear();
                    novel.chapters.push(chapter);
                }
                EmptyChapterBehavior::Fail => return Err(e),
            },
            Err(e) if e.is_transport() => {
                warn!(chapter = chapter.id, url = %chapter.url, error = %e, "skipped chapter");
            }
            Err(e) => return Err(e),
        }
    }

    if novel.chapters.is_empty() {
        return Err(ScraperError::NoChaptersRetrieved);
    }
    info!(
        chapters = novel.chapters.len(),
        total, "finished downloading chapters"
    );
    Ok(novel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Volume;
    use std::cell::RefCell;

    type MakeError = fn(u32) -> ScraperError;

    /// In-memory scraper: chapter id -> canned body result.
    struct FakeScraper {
        bodies: HashMap<u32, Result<String, MakeError>>,
        image_passes: u32,
    }

    impl FakeScraper {
        fn new() -> Self {
            Self {
                bodies: HashMap::new(),
                image_passes: 0,
            }
        }
    }

    impl Scraper for FakeScraper {
        fn read_novel_info(&mut self) -> Result<Novel, ScraperError> {
            let mut volume = Volume::new(1, "Volume 1");
            let chapters = (1..=3)
                .map(|id| {
                    volume.push_chapter(id);
                    Chapter::new(
                        id,
                        format!("https://wanderinginn.com/2016/07/{:02}/1-0{}/", id, id),
                        "",
                        1,
                    )
                })
                .collect();
            Ok(Novel {
                title: "The Wandering Inn".to_string(),
                author: "Pirateaba".to_string(),
                volumes: vec![volume],
                chapters,
                source_url: None,
            })
        }

        fn download_chapter_body(&mut self, chapter: &Chapter) -> Result<String, ScraperError> {
            match self.bodies.get(&chapter.id) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(make)) => Err(make(chapter.id)),
                None => Ok(format!("<p>Body {}</p>", chapter.id)),
            }
        }

        fn extract_chapter_images(&mut self, chapter: &mut Chapter) -> Result<(), ScraperError> {
            self.image_passes += 1;
            rewrite_chapter_images(chapter)
        }
    }

    fn missing(id: u32) -> ScraperError {
        ScraperError::MissingData {
            what: "chapter content".to_string(),
            url: format!("chapter {}", id),
        }
    }

    #[test]
    fn scrape_downloads_every_chapter_in_order() -> Result<(), ScraperError> {
        let mut fake = FakeScraper::new();
        let seen = RefCell::new(Vec::new());
        let progress = |n: u32, total: u32| seen.borrow_mut().push((n, total));
        let options = ScrapeOptions {
            progress: Some(&progress),
            ..Default::default()
        };
        let novel = scrape_novel(&mut fake, &options)?;
        let ids: Vec<u32> = novel.chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(novel.chapters[1].body, "<p>Body 2</p>");
        assert_eq!(*seen.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(fake.image_passes, 3);
        Ok(())
    }

    #[test]
    fn toc_only_returns_range_without_bodies() -> Result<(), ScraperError> {
        let mut fake = FakeScraper::new();
        let options = ScrapeOptions {
            chapter_range: Some((2, 3)),
            toc_only: true,
            ..Default::default()
        };
        let novel = scrape_novel(&mut fake, &options)?;
        assert_eq!(novel.chapters.len(), 2);
        assert_eq!(novel.chapters[0].id, 2);
        assert!(novel.chapters.iter().all(|c| c.body.is_empty()));
        assert_eq!(fake.image_passes, 0);
        Ok(())
    }

    #[test]
    fn missing_content_follows_empty_chapter_behavior() -> Result<(), ScraperError> {
        let mut fake = FakeScraper::new();
        fake.bodies.insert(2, Err(missing as MakeError));
        fake.bodies.insert(3, Ok("   ".to_string()));

        let skipped = scrape_novel(&mut fake, &ScrapeOptions::default())?;
        assert_eq!(skipped.chapters.len(), 1);

        let placeholder = scrape_novel(
            &mut fake,
            &ScrapeOptions {
                empty_chapter_behavior: Some(EmptyChapterBehavior::Placeholder),
                ..Default::default()
            },
        )?;
        assert_eq!(placeholder.chapters.len(), 3);
        assert_eq!(placeholder.chapters[1].title, "Chapter 2 (no content)");

        let failed = scrape_novel(
            &mut fake,
            &ScrapeOptions {
                empty_chapter_behavior: Some(EmptyChapterBehavior::Fail),
                ..Default::default()
            },
        );
        assert!(matches!(failed, Err(ScraperError::MissingData { .. })));
        Ok(())
    }

    fn bad_color(_: u32) -> ScraperError {
        ScraperError::InvalidColor {
            value: "rgb(1, 2, 3)".to_string(),
        }
    }

    #[test]
    fn invalid_color_in_one_chapter_keeps_the_others() -> Result<(), ScraperError> {
        let mut fake = FakeScraper::new();
        fake.bodies.insert(2, Err(bad_color as MakeError));

        let skipped = scrape_novel(&mut fake, &ScrapeOptions::default())?;
        let ids: Vec<u32> = skipped.chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(skipped.chapters[1].body, "<p>Body 3</p>");

        let placeholder = scrape_novel(
            &mut fake,
            &ScrapeOptions {
                empty_chapter_behavior: Some(EmptyChapterBehavior::Placeholder),
                ..Default::default()
            },
        )?;
        assert_eq!(placeholder.chapters.len(), 3);
        assert_eq!(placeholder.chapters[1].title, "Chapter 2 (no content)");

        let failed = scrape_novel(
            &mut fake,
            &ScrapeOptions {
                empty_chapter_behavior: Some(EmptyChapterBehavior::Fail),
                ..Default::default()
            },
        );
        assert!(matches!(failed, Err(ScraperError::InvalidColor { .. })));
        Ok(())
    }

    #[test]
    fn unresolvable_image_url_skips_only_that_chapter() -> Result<(), ScraperError> {
        let mut fake = FakeScraper::new();
        fake.bodies.insert(
            1,
            Ok("<p>Map.</p>\n<img src=\"http://[broken/map.png\" alt=\"\"/>".to_string()),
        );
        let novel = scrape_novel(&mut fake, &ScrapeOptions::default())?;
        let ids: Vec<u32> = novel.chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(fake.image_passes, 3);
        Ok(())
    }

    #[test]
    fn chapter_content_errors_are_classified() {
        assert!(missing(1).is_chapter_content());
        assert!(bad_color(1).is_chapter_content());
        assert!(!ScraperError::NoChaptersRetrieved.is_chapter_content());
        assert!(!ScraperError::ChapterListParse {
            reason: "chapter link before any volume".to_string()
        }
        .is_chapter_content());
    }

    #[test]
    fn no_chapters_retrieved_is_an_error() {
        let mut fake = FakeScraper::new();
        for id in 1..=3 {
            fake.bodies.insert(id, Err(missing as MakeError));
        }
        let result = scrape_novel(&mut fake, &ScrapeOptions::default());
        assert!(matches!(result, Err(ScraperError::NoChaptersRetrieved)));
    }

    #[test]
    fn images_are_resolved_and_renamed() -> Result<(), ScraperError> {
        let mut chapter = Chapter::new(
            12,
            "https://wanderinginn.com/2017/01/01/2-12/".to_string(),
            "2.12",
            2,
        );
        chapter.body = concat!(
            "<p>Look.</p>\n",
            "<img src=\"/wp-content/uploads/map.PNG\" alt=\"map\"/>\n",
            "<img src=\"https://i.imgur.com/abc\" alt=\"\"/>\n",
            "<img src=\"/wp-content/uploads/map.PNG\" alt=\"again\"/>"
        )
        .to_string();
        rewrite_chapter_images(&mut chapter)?;

        assert_eq!(chapter.images.len(), 2);
        assert_eq!(
            chapter.images.get("00012_01.png").map(String::as_str),
            Some("https://wanderinginn.com/wp-content/uploads/map.PNG")
        );
        assert_eq!(
            chapter.images.get("00012_02.jpg").map(String::as_str),
            Some("https://i.imgur.com/abc")
        );
        assert_eq!(chapter.body.matches("src=\"images/00012_01.png\"").count(), 2);
        assert!(!chapter.body.contains("wp-content"));
        Ok(())
    }
}
