// Tests for multi-root crawl orchestration

use async_trait::async_trait;
use delve_core::crawl::{Orchestrator, extract_url_path};
use delve_core::error::{CrawlError, Result};
use delve_core::report::CrawlSink;
use delve_scanner::crawler::{Crawler, CrawlerConfig};
use delve_scanner::error::ScanError;
use delve_scanner::render::{LoadedPage, RenderedPage, Renderer};
use delve_scanner::{HtmlParser, RootResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default, Clone)]
struct FakeSite {
    pages: HashMap<String, String>,
    renders: Arc<Mutex<Vec<String>>>,
}

impl FakeSite {
    fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl Renderer for FakeSite {
    async fn render(&self, url: &str) -> delve_scanner::error::Result<Box<dyn LoadedPage>> {
        self.renders.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .map(|html| -> Box<dyn LoadedPage> {
                Box::new(RenderedPage {
                    final_url: url.to_string(),
                    html: html.clone(),
                })
            })
            .ok_or_else(|| ScanError::Render {
                url: url.to_string(),
                reason: "404".to_string(),
            })
    }
}

#[derive(Default)]
struct MemorySink {
    began: usize,
    roots: Vec<RootResult>,
    urls: Vec<String>,
    finished: bool,
}

impl CrawlSink for MemorySink {
    fn begin(&mut self) -> Result<()> {
        self.began += 1;
        Ok(())
    }

    fn write_root(&mut self, result: &RootResult) -> Result<()> {
        self.roots.push(result.clone());
        Ok(())
    }

    fn write_url(&mut self, url: &str) -> Result<()> {
        self.urls.push(url.to_string());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

fn crawler_for(site: FakeSite, max_pages: usize) -> Crawler {
    Crawler::with_collaborators(
        Box::new(site),
        Box::new(HtmlParser::new().unwrap()),
        CrawlerConfig {
            max_pages,
            settle_delay: Duration::ZERO,
            render_timeout: Duration::from_secs(5),
        },
    )
}

fn sample_site() -> FakeSite {
    FakeSite::default()
        .page(
            "http://a.test/app/",
            r#"<a href="http://a.test/app/sub/">sub</a>
               <a href="http://a.test/other/x.php">elsewhere</a>
               <a href="search.php?q=1#frag">search</a>
               <form action="submit.php" method="POST"></form>"#,
        )
        .page(
            "http://a.test/app/sub/",
            r#"<a href="../">up</a>
               <a href="deep/">deep</a>
               <a href="item.php?id=7">item</a>
               <form action="/app/submit.php" method="post"></form>"#,
        )
        .page("http://a.test/app/sub/deep/", "<p>bottom</p>")
        .page("http://a.test/app/search.php?q=1", "<p>results</p>")
        .page("http://a.test/app/sub/item.php?id=7", "<p>item</p>")
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_directory_promoted_and_out_of_scope_dropped() {
    let site = sample_site();
    let renders = site.renders.clone();
    let crawler = crawler_for(site, 30);
    let mut sink = MemorySink::default();

    let mut orchestrator = Orchestrator::new(&["http://a.test/app/"]).unwrap();
    let summary = orchestrator.run(&crawler, &mut sink).await.unwrap();

    let roots: Vec<_> = sink.roots.iter().map(|r| r.root.as_str()).collect();
    assert_eq!(
        roots,
        vec![
            "http://a.test/app/",
            "http://a.test/app/sub/",
            "http://a.test/app/sub/deep/"
        ]
    );
    assert_eq!(summary.roots_processed, 3);
    assert!(sink.roots[0].directories.contains("http://a.test/app/sub/"));

    for root in &sink.roots {
        assert!(!root.found_urls.contains("http://a.test/other/x.php"));
    }
    assert!(!sink.urls.contains(&"http://a.test/other/x.php".to_string()));
    assert!(
        !renders
            .lock()
            .unwrap()
            .contains(&"http://a.test/other/x.php".to_string())
    );
}

#[tokio::test]
async fn test_post_form_endpoint_resolved() {
    let crawler = crawler_for(sample_site(), 30);
    let mut sink = MemorySink::default();

    let mut orchestrator = Orchestrator::new(&["http://a.test/app/"]).unwrap();
    orchestrator.run(&crawler, &mut sink).await.unwrap();

    assert!(
        sink.roots[0]
            .post_endpoints
            .contains("http://a.test/app/submit.php")
    );
}

#[tokio::test]
async fn test_fragment_stripped_candidate() {
    let crawler = crawler_for(sample_site(), 30);
    let mut sink = MemorySink::default();

    let mut orchestrator = Orchestrator::new(&["http://a.test/app/"]).unwrap();
    orchestrator.run(&crawler, &mut sink).await.unwrap();

    assert!(
        sink.roots[0]
            .vuln_candidates
            .contains("http://a.test/app/search.php?q=1")
    );
    assert!(sink.urls.iter().all(|u| !u.contains('#')));
}

#[test]
fn test_empty_seed_list_is_config_error() {
    let seeds: Vec<String> = vec![];
    let err = Orchestrator::new(&seeds).err().unwrap();
    assert!(matches!(err, CrawlError::Config(_)));
}

// ============================================================================
// Global properties
// ============================================================================

#[tokio::test]
async fn test_flat_stream_has_no_duplicates() {
    let crawler = crawler_for(sample_site(), 30);
    let mut sink = MemorySink::default();

    let mut orchestrator =
        Orchestrator::new(&["http://a.test/app/", "http://a.test/app/sub/"]).unwrap();
    orchestrator.run(&crawler, &mut sink).await.unwrap();

    let distinct: HashSet<_> = sink.urls.iter().collect();
    assert_eq!(distinct.len(), sink.urls.len());

    // The sub directory was found from several roots and categories
    assert_eq!(
        sink.urls
            .iter()
            .filter(|u| u.as_str() == "http://a.test/app/sub/")
            .count(),
        1
    );
    // Every category makes it into the flat list
    assert!(sink.urls.contains(&"http://a.test/app/submit.php".to_string()));
    assert!(sink.urls.contains(&"http://a.test/app/sub/item.php?id=7".to_string()));
}

#[tokio::test]
async fn test_flat_stream_in_discovery_order() {
    let crawler = crawler_for(sample_site(), 30);
    let mut sink = MemorySink::default();

    let mut orchestrator = Orchestrator::new(&["http://a.test/app/"]).unwrap();
    orchestrator.run(&crawler, &mut sink).await.unwrap();

    // First root: visited pages in BFS order, then its POST endpoint
    assert_eq!(
        sink.urls[..6].to_vec(),
        vec![
            "http://a.test/app/".to_string(),
            "http://a.test/app/sub/".to_string(),
            "http://a.test/app/search.php?q=1".to_string(),
            "http://a.test/app/sub/deep/".to_string(),
            "http://a.test/app/sub/item.php?id=7".to_string(),
            "http://a.test/app/submit.php".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_each_root_processed_once() {
    let crawler = crawler_for(sample_site(), 30);
    let mut sink = MemorySink::default();

    let mut orchestrator = Orchestrator::new(&[
        "http://a.test/app/",
        "http://a.test/app/#again",
        "http://a.test/app/sub/",
    ])
    .unwrap();
    orchestrator.run(&crawler, &mut sink).await.unwrap();

    let roots: Vec<_> = sink.roots.iter().map(|r| r.root.clone()).collect();
    let distinct: HashSet<_> = roots.iter().collect();
    assert_eq!(distinct.len(), roots.len());
    assert_eq!(sink.began, 1);
    assert!(sink.finished);
}

#[tokio::test]
async fn test_page_budget_per_root() {
    let mut index = String::new();
    for i in 0..20 {
        index.push_str(&format!(r#"<a href="p{}.html">p</a>"#, i));
    }
    let mut site = FakeSite::default().page("http://a.test/", &index);
    for i in 0..20 {
        site = site.page(&format!("http://a.test/p{}.html", i), "<p>leaf</p>");
    }
    let crawler = crawler_for(site, 5);
    let mut sink = MemorySink::default();

    let mut orchestrator = Orchestrator::new(&["http://a.test/"]).unwrap();
    let summary = orchestrator.run(&crawler, &mut sink).await.unwrap();

    assert_eq!(summary.pages_visited, 5);
    assert!(sink.roots[0].budget_reached);
    assert_eq!(sink.roots[0].found_urls.len(), 5);
}

#[tokio::test]
async fn test_unreachable_seed_does_not_stop_run() {
    let crawler = crawler_for(sample_site(), 30);
    let mut sink = MemorySink::default();

    let mut orchestrator =
        Orchestrator::new(&["http://down.test/", "http://a.test/app/sub/deep/"]).unwrap();
    let summary = orchestrator.run(&crawler, &mut sink).await.unwrap();

    assert_eq!(summary.roots_processed, 2);
    assert!(sink.roots[0].found_urls.is_empty());
    assert_eq!(sink.urls, vec!["http://a.test/app/sub/deep/".to_string()]);
}

#[test]
fn test_extract_url_path_with_query_and_fragment() {
    assert_eq!(extract_url_path("http://example.com/api?key=value#top"), "/api");
    assert_eq!(extract_url_path("http://localhost:3000/api/test"), "/api/test");
}

#[tokio::test]
async fn test_summary_counts_distinct_urls() {
    let crawler = crawler_for(sample_site(), 30);
    let mut sink = MemorySink::default();

    let mut orchestrator = Orchestrator::new(&["http://a.test/app/"]).unwrap();
    let summary = orchestrator.run(&crawler, &mut sink).await.unwrap();

    // Every promoted root lists itself, so per-root totals overcount
    let per_root: usize = sink.roots.iter().map(|r| r.directories.len()).sum();
    assert!(per_root > 3);

    assert_eq!(summary.directories, 3);
    assert_eq!(summary.vuln_candidates, 2);
    assert_eq!(summary.post_endpoints, 1);
}
