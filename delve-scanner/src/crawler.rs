use crate::classify::{Classification, classify, is_post_method};
use crate::error::{Result, ScanError};
use crate::frontier::{Frontier, FrontierState};
use crate::parse::{HtmlParser, ParsedPage, Parser};
use crate::render::{HttpRenderer, LoadedPage, RenderedPage, Renderer};
use crate::result::{PageOutcome, PageResult, RootResult};
use crate::scope::{normalize_url, resolve_url, scope_of};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Called with the 1-based page number and URL before each render.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub const DEFAULT_MAX_PAGES: usize = 30;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerConfig {
    /// Pages per root counted against the budget
    pub max_pages: usize,
    /// Wait after each render so late scripts can finish touching the DOM
    pub settle_delay: Duration,
    pub render_timeout: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            settle_delay: DEFAULT_SETTLE_DELAY,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

/// Breadth-first visitor for a single crawl root.
///
/// Pages are handled one at a time: render, settle, extract, classify,
/// enqueue. A page that fails to render or extract is marked visited and
/// skipped; it never stops the run.
pub struct Crawler {
    renderer: Box<dyn Renderer>,
    parser: Box<dyn Parser>,
    config: CrawlerConfig,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    /// Crawler with the HTTP renderer and the HTML parser.
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let renderer = HttpRenderer::new(config.render_timeout)?;
        Ok(Self::with_collaborators(
            Box::new(renderer),
            Box::new(HtmlParser::new()?),
            config,
        ))
    }

    pub fn with_collaborators(
        renderer: Box<dyn Renderer>,
        parser: Box<dyn Parser>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            renderer,
            parser,
            config,
            progress_callback: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.config.render_timeout = timeout;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawl everything reachable under `start_url`'s scope prefix, up to
    /// the page budget.
    pub async fn crawl_root(&self, start_url: &str) -> RootResult {
        let root = normalize_url(start_url);
        if root.is_empty() {
            return RootResult::default();
        }

        let scope_prefix = scope_of(&root);
        info!("Crawling root {} (scope {})", root, scope_prefix);

        let mut frontier = Frontier::new(&root, scope_prefix.clone(), self.config.max_pages);
        let mut result = RootResult::new(root.clone(), scope_prefix);

        while let Some(current) = frontier.next_url() {
            let outcome = self.visit(&current, &mut frontier, &mut result).await;
            debug!("{} -> {:?}", current, outcome);
        }

        result.pages_visited = frontier.pages();
        result.budget_reached = frontier.state() == FrontierState::BudgetReached;
        if result.budget_reached {
            debug!(
                "Page budget of {} reached for {}, discarding {} queued URLs",
                self.config.max_pages,
                root,
                frontier.pending()
            );
        }

        info!(
            "Root {} done: {} pages, {} urls, {} candidates, {} post endpoints, {} directories",
            root,
            result.pages_visited,
            result.found_urls.len(),
            result.vuln_candidates.len(),
            result.post_endpoints.len(),
            result.directories.len()
        );
        result
    }

    /// One frontier step for a URL that has not been visited yet.
    async fn visit(
        &self,
        requested: &str,
        frontier: &mut Frontier,
        result: &mut RootResult,
    ) -> PageOutcome {
        if let Some(ref callback) = self.progress_callback {
            callback(frontier.pages() + 1, requested.to_string());
        }

        let page = match self.render(requested).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Render error for {}: {}", requested, e);
                frontier.mark_visited(requested);
                return PageOutcome::RenderFailed;
            }
        };

        let mut current = requested.to_string();
        let final_url = normalize_url(&page.final_url);
        let mut revisit = false;
        if !final_url.is_empty() && final_url != current {
            debug!("{} redirected to {}", current, final_url);
            if frontier.is_visited(&final_url) {
                debug!("Redirect target {} was already visited, processing again", final_url);
                revisit = true;
            }
            result.found_urls.insert(current.as_str());
            result.found_urls.insert(final_url.as_str());
            frontier.mark_visited(&current);
            current = final_url;
        }

        let parsed = match self.parser.parse(&page.html) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Could not extract content from {}: {}", current, e);
                frontier.mark_visited(&current);
                return PageOutcome::ExtractionFailed;
            }
        };

        let page_result = harvest(&current, &parsed);

        for (action, method) in &page_result.forms {
            if method == "post" {
                debug!("POST endpoint found: {}", action);
                result.post_endpoints.insert(action.as_str());
            }
        }

        let class = classify(&current, frontier.scope_prefix());
        match class {
            Classification::VulnCandidate => debug!("Parameterized URL found: {}", current),
            Classification::Directory => debug!("Directory found: {}", current),
            Classification::Plain => {}
        }
        result.record(&current, class);

        for link in &page_result.links {
            frontier.enqueue(link);
        }

        frontier.mark_visited(&current);
        frontier.record_page();
        if revisit {
            PageOutcome::Revisited(class)
        } else {
            PageOutcome::Visited(class)
        }
    }

    /// Navigate, wait out the settle delay, then read the DOM. Navigation
    /// and the read are each bounded by the render timeout.
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let loaded: Box<dyn LoadedPage> = self.bounded(url, self.renderer.render(url)).await?;

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        self.bounded(url, loaded.snapshot()).await
    }

    async fn bounded<T>(&self, url: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.config.render_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(done) => done,
            Err(_) => Err(ScanError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }
}

/// Resolve a page's anchors and forms against its URL.
///
/// Empty hrefs are dropped. A form with no action submits to the page
/// itself, and a form with no method is a GET.
pub fn harvest(page_url: &str, parsed: &ParsedPage) -> PageResult {
    let forms = parsed
        .forms
        .iter()
        .filter_map(|form| {
            let target = match form.action.as_deref() {
                Some(action) if !action.is_empty() => resolve_url(page_url, action)?,
                _ => normalize_url(page_url),
            };
            let method = if is_post_method(form.method.as_deref()) {
                "post".to_string()
            } else {
                form.method
                    .as_deref()
                    .map(|m| m.trim().to_lowercase())
                    .unwrap_or_else(|| "get".to_string())
            };
            Some((target, method))
        })
        .collect();

    let links = parsed
        .anchors
        .iter()
        .filter_map(|anchor| anchor.href.as_deref())
        .filter(|href| !href.is_empty())
        .filter_map(|href| resolve_url(page_url, href))
        .filter(|url| !url.is_empty())
        .collect();

    PageResult { links, forms }
}
