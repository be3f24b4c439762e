//! The Wandering Inn adapter. Reads volumes and chapters from the table of contents,
//! then each chapter page; inline colour styling becomes `[[name: ...]]` annotations.

use crate::model::{Chapter, Novel, Volume};
use crate::scraper::cleaner::Cleaner;
use crate::scraper::colors::ColorResolver;
use crate::scraper::error::ScraperError;
use crate::scraper::markup::{escape_non_bmp, inner_html_with, Splice};
use crate::scraper::{parse_selector, rewrite_chapter_images, PoliteClient, Scraper};
use reqwest::Url;
use scraper::{ElementRef, Html};
use tracing::{debug, info};

pub const TABLE_OF_CONTENTS_URL: &str = "https://wanderinginn.com/table-of-contents/";
const AUTHOR: &str = "Pirateaba";

/// Navigation paragraphs on every chapter page.
const BOILERPLATE: [&str; 3] = ["Previous Chapter", "Table of Contents", "Next Chapter"];

/// Chapter permalinks are dated (`/2017/03/14/...`); other links in the listing are not.
const CHAPTER_LINK: &str = "a[href*=\"/20\"]";

/// Require a wanderinginn.com URL. Returns the parsed URL.
pub fn ensure_site_url(url: &str) -> Result<Url, ScraperError> {
    let parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        input: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.host_str() {
        Some(host) if host == "wanderinginn.com" || host.ends_with(".wanderinginn.com") => {
            Ok(parsed)
        }
        _ => Err(ScraperError::InvalidUrl {
            input: url.to_string(),
            reason: "expected a wanderinginn.com URL".to_string(),
        }),
    }
}

/// Wandering Inn scraper. Holds the shared polite client, its own cleaner, and colour cache.
pub struct WanderingInnScraper<'a> {
    client: &'a mut PoliteClient,
    novel_url: String,
    cleaner: Cleaner,
    colors: ColorResolver,
}

impl<'a> WanderingInnScraper<'a> {
    pub fn new(client: &'a mut PoliteClient) -> Result<Self, ScraperError> {
        let mut cleaner = Cleaner::new();
        cleaner.update_bad_text(BOILERPLATE)?;
        Ok(Self {
            client,
            novel_url: TABLE_OF_CONTENTS_URL.to_string(),
            cleaner,
            colors: ColorResolver::new(),
        })
    }

    /// Read the table of contents from another wanderinginn.com URL (e.g. a mirror path).
    pub fn with_novel_url(mut self, url: &str) -> Result<Self, ScraperError> {
        self.novel_url = ensure_site_url(url)?.to_string();
        Ok(self)
    }

    /// Extra bad-text patterns on top of the site navigation phrases.
    pub fn extend_bad_text<I, S>(&mut self, patterns: I) -> Result<(), ScraperError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cleaner.update_bad_text(patterns)
    }
}

/// Parse the table-of-contents page into title, fixed author, volumes, and chapters.
///
/// Walks the direct children of `div.entry-content`: a `book` element opens a volume, a
/// `chapters` element contributes its dated links to the most recent volume. Chapter ids
/// are global across volumes.
pub fn parse_table_of_contents(html: &str, page_url: &Url) -> Result<Novel, ScraperError> {
    let doc = Html::parse_document(html);
    let site_name_sel = parse_selector("meta[property=\"og:site_name\"]")?;
    let entries_sel = parse_selector("div.entry-content > *")?;
    let link_sel = parse_selector(CHAPTER_LINK)?;

    let title = doc
        .select(&site_name_sel)
        .next()
        .and_then(|e| e.value().attr("content"))
        .map(String::from)
        .ok_or_else(|| ScraperError::MissingData {
            what: "novel title (og:site_name)".to_string(),
            url: page_url.to_string(),
        })?;

    let mut volumes: Vec<Volume> = Vec::new();
    let mut chapters: Vec<Chapter> = Vec::new();
    for el in doc.select(&entries_sel) {
        let value = el.value();
        if value.attr("class").is_none() {
            continue;
        }
        if value.classes().any(|c| c == "book") {
            let id = volumes.len() as u32 + 1;
            volumes.push(Volume::new(id, &element_text(el)));
        } else if value.classes().any(|c| c == "chapters") {
            for link in el.select(&link_sel) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                let volume = volumes
                    .last_mut()
                    .ok_or_else(|| ScraperError::ChapterListParse {
                        reason: format!(
                            "chapter link {:?} appears before any volume heading",
                            href
                        ),
                    })?;
                let url = page_url.join(href).map_err(|e| ScraperError::InvalidUrl {
                    input: href.to_string(),
                    reason: e.to_string(),
                })?;
                let id = chapters.len() as u32 + 1;
                chapters.push(Chapter::new(
                    id,
                    url.to_string(),
                    &element_text(link),
                    volume.id,
                ));
                volume.push_chapter(id);
            }
        }
    }

    Ok(Novel {
        title,
        author: AUTHOR.to_string(),
        volumes,
        chapters,
        source_url: Some(page_url.to_string()),
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Value of the first `color:` declaration in an inline style, trimmed.
fn color_declaration(style: &str) -> Option<&str> {
    style
        .split(';')
        .map(str::trim)
        .find(|part| part.starts_with("color:"))
        .and_then(|part| part.split(':').nth(1))
        .map(str::trim)
}

/// Inner markup of `container` with every colour-styled element wrapped in `[[name: ` ... `]]`.
pub fn annotate_colors(
    container: ElementRef<'_>,
    colors: &ColorResolver,
) -> Result<String, ScraperError> {
    inner_html_with(container, &mut |el| {
        let Some(hex) = el.value().attr("style").and_then(color_declaration) else {
            return Ok(None);
        };
        let name = colors.resolve(hex)?;
        Ok(Some(Splice {
            before: format!("[[{}: ", name),
            after: "]]".to_string(),
        }))
    })
}

/// Parse a chapter page: annotate colours inside `div.entry-content`, then clean it.
pub fn parse_chapter_body(
    html: &str,
    url: &str,
    cleaner: &Cleaner,
    colors: &ColorResolver,
) -> Result<String, ScraperError> {
    let doc = Html::parse_document(html);
    let content_sel = parse_selector("div.entry-content")?;
    let container = doc
        .select(&content_sel)
        .next()
        .ok_or_else(|| ScraperError::MissingData {
            what: "chapter content (div.entry-content)".to_string(),
            url: url.to_string(),
        })?;
    let annotated = annotate_colors(container, colors)?;
    Ok(cleaner.extract_contents(&annotated))
}

impl Scraper for WanderingInnScraper<'_> {
    fn read_novel_info(&mut self) -> Result<Novel, ScraperError> {
        debug!(url = %self.novel_url, "visiting table of contents");
        let page_url = ensure_site_url(&self.novel_url)?;
        let html = self.client.get_html(&self.novel_url, "table of contents")?;
        let novel = parse_table_of_contents(&html, &page_url)?;
        info!(title = %novel.title, "novel title");
        info!(author = %novel.author, "novel author");
        info!(
            volumes = novel.volumes.len(),
            chapters = novel.chapters.len(),
            "read table of contents"
        );
        Ok(novel)
    }

    fn download_chapter_body(&mut self, chapter: &Chapter) -> Result<String, ScraperError> {
        let context = format!("chapter {}", chapter.id);
        let html = self.client.get_html(&chapter.url, &context)?;
        parse_chapter_body(&html, &chapter.url, &self.cleaner, &self.colors)
    }

    fn extract_chapter_images(&mut self, chapter: &mut Chapter) -> Result<(), ScraperError> {
        rewrite_chapter_images(chapter)?;
        // Image rewriting leaves raw astral-plane characters; downstream XML writers reject them.
        chapter.body = escape_non_bmp(&chapter.body).into_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOC_HTML: &str = r#"<!DOCTYPE html><html><head>
<meta property="og:site_name" content="The Wandering Inn"/>
<meta property="og:title" content="Table of Contents"/>
</head><body>
<div class="entry-content">
<p>Read the story in order, starting below.</p>
<div class="book"> Volume 1 </div>
<div class="chapters">
  <a href="https://wanderinginn.com/2016/07/27/1-00/">1.00</a>
  <a href="https://www.patreon.com/pirateaba">Support on Patreon</a>
  <a href="/2016/07/30/1-01/">1.01</a>
  <a href="/2016/08/03/1-02/">1.02</a>
</div>
<div class="book"><span> </span></div>
<div class="chapters">
  <a href="/about/">About</a>
  <a href="/2017/03/03/2-00/">  </a>
  <a href="/2017/03/07/2-01/">2.01</a>
</div>
<h2 class="wp-block-heading">Side Stories</h2>
</div>
</body></html>"#;

    fn toc_url() -> Url {
        Url::parse(TABLE_OF_CONTENTS_URL).unwrap()
    }

    fn chapter_page(content: &str) -> String {
        format!(
            r#"<html><body><article><div class="entry-content">{}</div></article></body></html>"#,
            content
        )
    }

    fn boilerplate_cleaner() -> Cleaner {
        let mut cleaner = Cleaner::new();
        cleaner.update_bad_text(BOILERPLATE).unwrap();
        cleaner
    }

    #[test]
    fn toc_produces_volumes_and_global_chapter_ids() -> Result<(), ScraperError> {
        let novel = parse_table_of_contents(TOC_HTML, &toc_url())?;
        assert_eq!(novel.title, "The Wandering Inn");
        assert_eq!(novel.author, "Pirateaba");
        assert_eq!(novel.volumes.len(), 2);
        assert_eq!(novel.chapters.len(), 5);

        let ids: Vec<u32> = novel.chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        let owners: Vec<u32> = novel.chapters.iter().map(|c| c.volume).collect();
        assert_eq!(owners, vec![1, 1, 1, 2, 2]);

        let v1 = &novel.volumes[0];
        assert_eq!(v1.title, "Volume 1");
        assert_eq!(
            (v1.start_chapter, v1.final_chapter, v1.chapter_count),
            (Some(1), Some(3), 3)
        );
        let v2 = &novel.volumes[1];
        assert_eq!(v2.title, "Volume 2");
        assert_eq!(
            (v2.start_chapter, v2.final_chapter, v2.chapter_count),
            (Some(4), Some(5), 2)
        );
        Ok(())
    }

    #[test]
    fn toc_resolves_links_and_defaults_titles() -> Result<(), ScraperError> {
        let novel = parse_table_of_contents(TOC_HTML, &toc_url())?;
        assert_eq!(novel.chapters[1].url, "https://wanderinginn.com/2016/07/30/1-01/");
        assert_eq!(novel.chapters[1].title, "1.01");
        assert_eq!(novel.chapters[3].url, "https://wanderinginn.com/2017/03/03/2-00/");
        assert_eq!(novel.chapters[3].title, "Chapter 4");
        assert_eq!(
            novel.source_url.as_deref(),
            Some("https://wanderinginn.com/table-of-contents/")
        );
        Ok(())
    }

    #[test]
    fn toc_ignores_undated_links() -> Result<(), ScraperError> {
        let novel = parse_table_of_contents(TOC_HTML, &toc_url())?;
        assert!(novel
            .chapters
            .iter()
            .all(|c| !c.url.contains("patreon") && !c.url.ends_with("/about/")));
        assert!(novel.chapters.iter().all(|c| c.url.contains("/20")));
        Ok(())
    }

    #[test]
    fn toc_keeps_site_name_verbatim() -> Result<(), ScraperError> {
        let html = r#"<html><head><meta property="og:site_name" content=" The Wandering Inn "/></head>
<body><div class="entry-content"></div></body></html>"#;
        let novel = parse_table_of_contents(html, &toc_url())?;
        assert_eq!(novel.title, " The Wandering Inn ");
        assert!(novel.volumes.is_empty());
        Ok(())
    }

    #[test]
    fn toc_without_site_name_is_missing_data() {
        let html = r#"<html><body><div class="entry-content"><div class="book">Volume 1</div></div></body></html>"#;
        let result = parse_table_of_contents(html, &toc_url());
        assert!(matches!(result, Err(ScraperError::MissingData { .. })));
    }

    #[test]
    fn toc_with_chapters_before_any_volume_fails() {
        let html = r#"<html><head><meta property="og:site_name" content="The Wandering Inn"/></head><body>
<div class="entry-content"><div class="chapters"><a href="/2016/07/27/1-00/">1.00</a></div></div></body></html>"#;
        let result = parse_table_of_contents(html, &toc_url());
        assert!(matches!(result, Err(ScraperError::ChapterListParse { .. })));
    }

    #[test]
    fn toc_volume_without_chapters_keeps_empty_counters() -> Result<(), ScraperError> {
        let html = r#"<html><head><meta property="og:site_name" content="TWI"/></head><body>
<div class="entry-content"><div class="book">Volume 10</div><div class="chapters"><a href="/x/">x</a></div></div></body></html>"#;
        let novel = parse_table_of_contents(html, &toc_url())?;
        assert_eq!(novel.volumes.len(), 1);
        assert!(novel.chapters.is_empty());
        assert_eq!(novel.volumes[0].start_chapter, None);
        assert_eq!(novel.volumes[0].chapter_count, 0);
        Ok(())
    }

    #[test]
    fn color_declaration_takes_first_color_only() {
        assert_eq!(
            color_declaration("color: #0000ff; font-weight: bold;"),
            Some("#0000ff")
        );
        assert_eq!(
            color_declaration("font-weight: bold; color:#00ff00; color:#ff0000"),
            Some("#00ff00")
        );
        assert_eq!(color_declaration("background-color:#ffffff"), None);
        assert_eq!(color_declaration("color : #ffffff"), None);
        assert_eq!(color_declaration(" color: #ABCDEF ;"), Some("#ABCDEF"));
    }

    #[test]
    fn colored_spans_are_annotated_with_names() -> Result<(), ScraperError> {
        let html = chapter_page(
            r#"<p>The <span style="color: #0000ff; font-weight: bold;">[Skill]</span> activated.</p>"#,
        );
        let colors = ColorResolver::new();
        let body = parse_chapter_body(
            &html,
            "https://wanderinginn.com/2017/01/01/x/",
            &Cleaner::new(),
            &colors,
        )?;
        assert_eq!(body, "<p>The [[blue: [Skill]]] activated.</p>");
        assert_eq!(colors.len(), 1);
        Ok(())
    }

    #[test]
    fn styles_without_color_are_left_alone() -> Result<(), ScraperError> {
        let html = chapter_page(r#"<p><em style="font-style: italic">quiet</em> words</p>"#);
        let body = parse_chapter_body(&html, "u", &Cleaner::new(), &ColorResolver::new())?;
        assert_eq!(body, "<p>quiet words</p>");
        Ok(())
    }

    #[test]
    fn nested_colors_are_annotated_independently() -> Result<(), ScraperError> {
        let html = chapter_page(
            r#"<p><span style="color:#ff0000">Red <b style="color:#ffd700">gold</b></span></p>"#,
        );
        let body = parse_chapter_body(&html, "u", &Cleaner::new(), &ColorResolver::new())?;
        assert_eq!(body, "<p>[[red: Red [[gold: gold]]]]</p>");
        Ok(())
    }

    #[test]
    fn navigation_paragraphs_are_stripped() -> Result<(), ScraperError> {
        let html = chapter_page(concat!(
            r#"<p><a href="/2017/01/01/a/">Previous Chapter</a> <a href="/table-of-contents/">Table of Contents</a></p>"#,
            r#"<p>Erin Solstice ran the inn.</p>"#,
            r#"<p><a href="/2017/01/09/c/">Next Chapter</a></p>"#,
        ));
        let body = parse_chapter_body(&html, "u", &boilerplate_cleaner(), &ColorResolver::new())?;
        assert_eq!(body, "<p>Erin Solstice ran the inn.</p>");
        Ok(())
    }

    #[test]
    fn missing_content_container_is_missing_data() {
        let html = "<html><body><div class=\"comments\">nothing</div></body></html>";
        let result = parse_chapter_body(html, "u", &Cleaner::new(), &ColorResolver::new());
        assert!(matches!(result, Err(ScraperError::MissingData { .. })));
    }

    #[test]
    fn unparseable_color_fails_the_chapter() {
        let html = chapter_page(r#"<p><span style="color: red">x</span></p>"#);
        let result = parse_chapter_body(&html, "u", &Cleaner::new(), &ColorResolver::new());
        assert!(matches!(result, Err(ScraperError::InvalidColor { .. })));
    }

    #[test]
    fn emoji_are_escaped_after_image_rewrite() -> Result<(), ScraperError> {
        let mut client = PoliteClient::builder().delay_secs(0).build().unwrap();
        let mut scraper = WanderingInnScraper::new(&mut client)?;
        let mut chapter = Chapter::new(
            3,
            "https://wanderinginn.com/2016/08/03/1-02/".to_string(),
            "1.02",
            1,
        );
        chapter.body = "<p>Mrsha \u{1F43A} waves</p>\n<img src=\"/wp/m.png\" alt=\"\"/>".to_string();
        scraper.extract_chapter_images(&mut chapter)?;
        assert!(chapter.body.contains("&#128058;"));
        assert!(!chapter.body.contains('\u{1F43A}'));
        assert!(chapter.body.contains("src=\"images/00003_01.png\""));
        Ok(())
    }

    #[test]
    fn site_url_must_be_wanderinginn() {
        assert!(ensure_site_url("https://wanderinginn.com/table-of-contents/").is_ok());
        assert!(ensure_site_url("https://www.wanderinginn.com/").is_ok());
        assert!(matches!(
            ensure_site_url("https://www.royalroad.com/fiction/1"),
            Err(ScraperError::InvalidUrl { .. })
        ));
        assert!(ensure_site_url("not a url").is_err());
    }
}
