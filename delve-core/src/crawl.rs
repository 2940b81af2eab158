use crate::error::{CrawlError, Result};
use crate::report::{CrawlSink, FileSink, OutputLayout, ReportFormat};
use delve_scanner::crawler::{Crawler, CrawlerConfig};
use delve_scanner::render::{DEFAULT_USER_AGENT, RendererKind, build_renderer};
use delve_scanner::scope::normalize_url;
use delve_scanner::{HtmlParser, RootResult};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub seeds: Vec<String>,
    pub crawler: CrawlerConfig,
    pub user_agent: Option<String>,
    pub renderer: RendererKind,
    pub output: OutputLayout,
    pub format: ReportFormat,
    pub show_progress_bars: bool,
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Totals for a finished run. Category counts are distinct URLs across
/// all roots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub roots_processed: usize,
    pub pages_visited: usize,
    /// Distinct URLs written to the flat list
    pub urls_written: usize,
    pub vuln_candidates: usize,
    pub post_endpoints: usize,
    pub directories: usize,
}

/// Drives one crawler over a growing set of roots.
///
/// Seeds go in first; every directory a root turns up is queued as a new
/// root unless it has already been crawled. Roots are processed one after
/// another from an explicit worklist. The flat URL stream is filtered
/// through a run-wide written set, so a URL found under several roots or in
/// several categories is emitted once.
pub struct Orchestrator {
    pending: VecDeque<String>,
    queued: HashSet<String>,
    processed: HashSet<String>,
    written: HashSet<String>,
    progress_callback: Option<CrawlProgressCallback>,
}

impl Orchestrator {
    /// Fails with [`CrawlError::Config`] when no seed survives normalization.
    pub fn new<S: AsRef<str>>(seeds: &[S]) -> Result<Self> {
        let mut orchestrator = Self {
            pending: VecDeque::new(),
            queued: HashSet::new(),
            processed: HashSet::new(),
            written: HashSet::new(),
            progress_callback: None,
        };

        for seed in seeds {
            orchestrator.push_root(seed.as_ref());
        }

        if orchestrator.pending.is_empty() {
            return Err(CrawlError::Config("no seed URLs to crawl".to_string()));
        }
        Ok(orchestrator)
    }

    pub fn with_progress_callback(mut self, callback: CrawlProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn push_root(&mut self, url: &str) -> bool {
        let root = normalize_url(url);
        if root.is_empty() || self.processed.contains(&root) || self.queued.contains(&root) {
            return false;
        }
        self.queued.insert(root.clone());
        self.pending.push_back(root);
        true
    }

    /// Next root that has not been crawled yet.
    pub fn next_root(&mut self) -> Option<String> {
        while let Some(candidate) = self.pending.pop_front() {
            self.queued.remove(&candidate);
            let root = normalize_url(&candidate);
            if root.is_empty() || self.processed.contains(&root) {
                continue;
            }
            return Some(root);
        }
        None
    }

    /// Record a crawled root and promote its directories to roots.
    /// Returns how many new roots were queued.
    pub fn complete_root(&mut self, root: &str, result: &RootResult) -> usize {
        let mut promoted = 0;
        for dir in result.directories.iter() {
            if self.push_root(dir) {
                debug!("Promoted directory {} to crawl root", dir);
                promoted += 1;
            }
        }
        self.processed.insert(root.to_string());
        promoted
    }

    /// URLs from `result` not yet written in this run, in flat-output order.
    /// Marks them written.
    pub fn take_unwritten(&mut self, result: &RootResult) -> Vec<String> {
        let mut fresh = Vec::new();
        for url in result.all_urls() {
            let url = normalize_url(url);
            if !url.is_empty() && self.written.insert(url.clone()) {
                fresh.push(url);
            }
        }
        fresh
    }

    pub fn is_processed(&self, root: &str) -> bool {
        self.processed.contains(root)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Crawl until no unprocessed roots remain.
    pub async fn run(&mut self, crawler: &Crawler, sink: &mut dyn CrawlSink) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::default();
        let mut candidates = HashSet::new();
        let mut posts = HashSet::new();
        let mut directories = HashSet::new();
        sink.begin()?;

        while let Some(root) = self.next_root() {
            if let Some(ref callback) = self.progress_callback {
                callback(format!("Crawling root {} ({} queued)", root, self.pending.len()));
            }

            let result = crawler.crawl_root(&root).await;
            let promoted = self.complete_root(&root, &result);
            if promoted > 0 {
                info!("{} new directories queued from {}", promoted, root);
            }

            sink.write_root(&result)?;
            for url in self.take_unwritten(&result) {
                sink.write_url(&url)?;
                summary.urls_written += 1;
            }

            summary.roots_processed += 1;
            summary.pages_visited += result.pages_visited;
            candidates.extend(result.vuln_candidates.iter().cloned());
            posts.extend(result.post_endpoints.iter().cloned());
            directories.extend(result.directories.iter().cloned());
        }

        summary.vuln_candidates = candidates.len();
        summary.post_endpoints = posts.len();
        summary.directories = directories.len();

        sink.finish()?;
        info!(
            "Crawl finished: {} roots, {} pages, {} distinct urls",
            summary.roots_processed, summary.pages_visited, summary.urls_written
        );
        Ok(summary)
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Execute a crawl with the given options, writing both artifacts through a
/// [`FileSink`].
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary> {
    let CrawlOptions {
        seeds,
        crawler: config,
        user_agent,
        renderer,
        output,
        format,
        show_progress_bars,
    } = options;

    // Seeds are checked before any output file is touched
    let mut orchestrator = Orchestrator::new(&seeds)?;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));

    let renderer = build_renderer(
        renderer,
        config.render_timeout,
        user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT),
    )
    .await?;
    let mut crawler = Crawler::with_collaborators(renderer, Box::new(HtmlParser::new()?), config);

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let count_clone = processed_count.clone();
        crawler = crawler.with_progress_callback(Arc::new(move |page: usize, url: String| {
            let total = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            pb_clone.set_message(format!(
                "[{}] {} ({} pages total)",
                page,
                extract_url_path(&url),
                total
            ));
        }));
    }

    let pb_for_roots = progress_bar.clone();
    let root_callback: CrawlProgressCallback = Arc::new(move |msg: String| {
        match pb_for_roots {
            Some(ref pb) => pb.println(&msg),
            None => {
                if let Some(ref callback) = progress_callback {
                    callback(msg);
                }
            }
        }
    });
    orchestrator = orchestrator.with_progress_callback(root_callback);

    let mut sink = FileSink::new(output, format);
    let summary = orchestrator.run(&crawler, &mut sink).await;

    if let Some(ref pb) = progress_bar {
        finish_spinner(pb, &summary, processed_count.load(Ordering::Relaxed));
    }

    summary
}

fn finish_spinner(pb: &ProgressBar, outcome: &Result<CrawlSummary>, rendered: usize) {
    match outcome {
        Ok(_) => pb.finish_with_message(format!("Crawl complete! {} pages rendered", rendered)),
        Err(_) => pb.finish_and_clear(),
    }
}
