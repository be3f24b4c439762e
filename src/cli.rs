//! CLI parsing and orchestration. Parses args, scrapes the novel, writes JSON. Maps errors to exit codes.

use crate::config;
use crate::model::Novel;
use crate::scraper::wanderinginn::WanderingInnScraper;
use crate::scraper::{scrape_novel, EmptyChapterBehavior, ScrapeOptions, ScraperError};
use crate::PoliteClient;
use clap::Parser;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("Failed to write output: {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize novel: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Output { .. } | CliRunError::Serialize(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "wanderscrape")]
#[command(about = "Scrape The Wandering Inn into a JSON novel (volumes, chapters, annotated text)")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, request_delay_secs, timeout_secs, retry_count, retry_backoff_secs, empty_chapters, extra_bad_text) are read from ./wanderscrape.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Table-of-contents URL (default: https://wanderinginn.com/table-of-contents/).
    #[arg(long)]
    pub url: Option<String>,

    /// Output path. Default: ./{sanitized-title}.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Scrape only chapters in this range (1-based inclusive, global numbering), e.g. 1-10.
    #[arg(long, value_parser = parse_chapter_range)]
    pub chapters: Option<(u32, u32)>,

    /// Chapters with no usable content (blank, missing, bad colour or image URL): skip (default), placeholder, or fail.
    #[arg(long, value_parser = parse_empty_chapter_behavior)]
    pub empty_chapters: Option<EmptyChapterBehavior>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 2).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Fetch the table of contents only; print volume/chapter counts and output path without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (warnings and errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_chapter_range(s: &str) -> Result<(u32, u32), String> {
    let s = s.trim();
    let (from_str, to_str) = s.split_once('-').ok_or_else(|| {
        format!(
            "Invalid --chapters: expected 'from-to' (e.g. 1-10), got '{}'",
            s
        )
    })?;
    let from_str = from_str.trim();
    let to_str = to_str.trim();
    let from: u32 = from_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid start chapter number",
            from_str
        )
    })?;
    let to: u32 = to_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid end chapter number",
            to_str
        )
    })?;
    if from > to {
        return Err(format!(
            "Invalid --chapters: start ({}) must be <= end ({})",
            from, to
        ));
    }
    Ok((from, to))
}

fn parse_empty_chapter_behavior(s: &str) -> Result<EmptyChapterBehavior, String> {
    match s.to_lowercase().as_str() {
        "skip" => Ok(EmptyChapterBehavior::Skip),
        "placeholder" => Ok(EmptyChapterBehavior::Placeholder),
        "fail" => Ok(EmptyChapterBehavior::Fail),
        _ => Err(format!(
            "Invalid --empty-chapters value: '{}'. Use skip, placeholder, or fail.",
            s
        )),
    }
}

/// Sanitize novel title to a safe filename: lowercase, replace spaces/special with `-`.
fn sanitize_title(title: &str) -> String {
    let mut s = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    // Collapse multiple dashes and trim
    while s.contains("--") {
        s = s.replace("--", "-");
    }
    s = s.trim_matches('-').to_string();
    if s.is_empty() {
        s = "novel".to_string();
    }
    s
}

fn default_output_path(output_dir: &Path, title: &str) -> PathBuf {
    output_dir.join(format!("{}.json", sanitize_title(title)))
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

fn write_json(novel: &Novel, path: &Path) -> Result<(), CliRunError> {
    let f = std::fs::File::create(path).map_err(|source| CliRunError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(f), novel)?;
    Ok(())
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;

    let effective_output_dir: PathBuf = config
        .as_ref()
        .and_then(|c| c.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    const DEFAULT_DELAY_SECS: u64 = 2;
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_RETRY_COUNT: u32 = 3;
    let delay_secs = args
        .delay
        .or_else(|| config.as_ref().and_then(|c| c.request_delay_secs))
        .unwrap_or(DEFAULT_DELAY_SECS);
    let timeout_secs = args
        .timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let retry_count = config
        .as_ref()
        .and_then(|c| c.retry_count)
        .unwrap_or(DEFAULT_RETRY_COUNT)
        .max(1);
    let retry_backoff_secs = config
        .as_ref()
        .and_then(|c| c.retry_backoff_secs.clone())
        .unwrap_or_else(|| vec![1, 2]);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()));

    let mut builder = PoliteClient::builder()
        .delay_secs(delay_secs)
        .timeout_secs(timeout_secs)
        .retry_count(retry_count)
        .retry_backoff_secs(retry_backoff_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let mut client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let mut adapter = WanderingInnScraper::new(&mut client)?;
    if let Some(ref url) = args.url {
        adapter = adapter.with_novel_url(url).map_err(|e| {
            CliRunError::InvalidInput(format!(
                "Expected a table-of-contents URL on wanderinginn.com. {}",
                e
            ))
        })?;
    }
    if let Some(patterns) = config.as_ref().and_then(|c| c.extra_bad_text.clone()) {
        adapter.extend_bad_text(patterns).map_err(|e| {
            CliRunError::InvalidInput(format!("Invalid extra_bad_text in config: {}", e))
        })?;
    }

    let empty_chapter_behavior = args
        .empty_chapters
        .or_else(|| {
            config
                .as_ref()
                .and_then(|c| c.empty_chapters.as_deref())
                .and_then(|s| parse_empty_chapter_behavior(s).ok())
        })
        .unwrap_or(EmptyChapterBehavior::Skip);

    if args.dry_run {
        let dry_run_opts = ScrapeOptions {
            chapter_range: args.chapters,
            toc_only: true,
            ..Default::default()
        };
        let novel = scrape_novel(&mut adapter, &dry_run_opts)?;
        let output_path = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&effective_output_dir, &novel.title));
        eprintln!("Volumes: {}", novel.volumes.len());
        eprintln!("Chapters: {}", novel.chapters.len());
        eprintln!("Output: {}", output_path.display());
        return Ok(());
    }

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            let style = indicatif::ProgressStyle::default_bar()
                .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .progress_chars("█▉▊▋▌▍▎▏ ");
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n as u64);
        pb.set_message(format!("Fetching chapter {}/{}", n, total));
    };
    let progress: Option<&dyn Fn(u32, u32)> = if args.quiet { None } else { Some(&progress_cb) };

    let scrape_opts = ScrapeOptions {
        progress,
        chapter_range: args.chapters,
        empty_chapter_behavior: Some(empty_chapter_behavior),
        toc_only: false,
    };
    let result = scrape_novel(&mut adapter, &scrape_opts);

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }
    let novel = result?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&effective_output_dir, &novel.title));
    validate_output_path(&output_path)?;
    write_json(&novel, &output_path)?;

    info!(path = %output_path.display(), chapters = novel.chapters.len(), "wrote novel");
    if !args.quiet {
        eprintln!("Wrote {}", output_path.display());
    }
    Ok(())
}
