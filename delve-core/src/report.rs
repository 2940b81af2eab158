// Report rendering and output sinks

use crate::error::Result;
use chrono::{DateTime, Utc};
use delve_scanner::RootResult;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_RESULTS_FILE: &str = "results.txt";
pub const DEFAULT_URLS_FILE: &str = "urls_only.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    /// One JSON object per crawl root, one per line
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" | "jsonl" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Sorted, serializable view of one root's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootReport {
    pub root: String,
    pub scope_prefix: String,
    pub pages_visited: usize,
    pub budget_reached: bool,
    pub found_urls: Vec<String>,
    pub vuln_candidates: Vec<String>,
    pub post_endpoints: Vec<String>,
    pub directories: Vec<String>,
    pub crawled_at: DateTime<Utc>,
}

impl RootReport {
    pub fn from_result(result: &RootResult) -> Self {
        Self {
            root: result.root.clone(),
            scope_prefix: result.scope_prefix.clone(),
            pages_visited: result.pages_visited,
            budget_reached: result.budget_reached,
            found_urls: result.found_urls.sorted(),
            vuln_candidates: result.vuln_candidates.sorted(),
            post_endpoints: result.post_endpoints.sorted(),
            directories: result.directories.sorted(),
            crawled_at: Utc::now(),
        }
    }
}

/// Human readable section for one crawl root.
pub fn render_root_section(result: &RootResult) -> String {
    let mut section = String::new();
    section.push_str(&format!("\n=== Crawl root: {} ===\n", result.root));

    section.push_str("\n--- Content URLs ---\n");
    for url in result.found_urls.sorted() {
        section.push_str(&url);
        section.push('\n');
    }

    section.push_str("\n--- Parameterized GET candidates ---\n");
    for url in result.vuln_candidates.sorted() {
        section.push_str(&url);
        section.push('\n');
    }

    section.push_str("\n--- POST endpoints ---\n");
    for url in result.post_endpoints.sorted() {
        section.push_str(&format!("POST {}\n", url));
    }

    section.push_str("\n--- Discovered directories ---\n");
    for url in result.directories.sorted() {
        section.push_str(&url);
        section.push('\n');
    }

    section
}

/// Receives crawl output as roots complete.
///
/// `write_url` only ever sees URLs that have not been written before in the
/// current run.
pub trait CrawlSink {
    /// Called once before the first root is crawled.
    fn begin(&mut self) -> Result<()>;
    fn write_root(&mut self, result: &RootResult) -> Result<()>;
    fn write_url(&mut self, url: &str) -> Result<()>;
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Where [`FileSink`] puts its two artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub results_path: PathBuf,
    pub urls_path: PathBuf,
}

impl OutputLayout {
    pub fn in_dir(dir: &Path, format: ReportFormat) -> Self {
        let results_name = match format {
            ReportFormat::Text => DEFAULT_RESULTS_FILE,
            ReportFormat::Json => "results.jsonl",
        };
        Self {
            results_path: dir.join(results_name),
            urls_path: dir.join(DEFAULT_URLS_FILE),
        }
    }
}

/// Detailed report plus flat URL list on disk.
///
/// Both files are truncated by [`CrawlSink::begin`] and appended to as
/// roots finish, so a crawl cut short still leaves every completed root on
/// disk.
pub struct FileSink {
    layout: OutputLayout,
    format: ReportFormat,
    results: Option<File>,
    urls: Option<File>,
}

impl FileSink {
    pub fn new(layout: OutputLayout, format: ReportFormat) -> Self {
        Self {
            layout,
            format,
            results: None,
            urls: None,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    fn open(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?)
    }
}

impl CrawlSink for FileSink {
    fn begin(&mut self) -> Result<()> {
        self.results = Some(Self::open(&self.layout.results_path)?);
        self.urls = Some(Self::open(&self.layout.urls_path)?);
        Ok(())
    }

    fn write_root(&mut self, result: &RootResult) -> Result<()> {
        let Some(file) = self.results.as_mut() else {
            return Ok(());
        };

        match self.format {
            ReportFormat::Text => file.write_all(render_root_section(result).as_bytes())?,
            ReportFormat::Json => {
                let line = serde_json::to_string(&RootReport::from_result(result))?;
                writeln!(file, "{}", line)?;
            }
        }
        file.flush()?;
        Ok(())
    }

    fn write_url(&mut self, url: &str) -> Result<()> {
        if let Some(file) = self.urls.as_mut() {
            writeln!(file, "{}", url)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(file) = self.urls.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}
