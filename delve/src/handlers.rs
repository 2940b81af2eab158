use clap::ArgMatches;
use colored::Colorize;
use delve_core::crawl::{CrawlOptions, CrawlProgressCallback, CrawlSummary, execute_crawl};
use delve_core::error::CrawlError;
use delve_core::report::{OutputLayout, ReportFormat};
use delve_scanner::RendererKind;
use delve_scanner::crawler::CrawlerConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

pub const DEFAULT_SEED_FILE: &str = "urls.txt";

// Helper functions for crawl handler

/// Load seeds from `--url`, `--hosts-file`, or `./urls.txt` when neither is
/// given.
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, CrawlError> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        load_urls_from_file(Path::new(DEFAULT_SEED_FILE))
    }
}

/// Load and parse seed URLs from a file, one per line. Blank lines are
/// ignored.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, CrawlError> {
    let content = fs::read_to_string(path).map_err(|e| {
        CrawlError::Config(format!("Failed to read seed file {}: {}", path.display(), e))
    })?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        return Err(CrawlError::Config(format!(
            "No valid URLs found in {}",
            path.display()
        )));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed.
///
/// The result is the `url` crate's serialization, so `http://Host` comes
/// back as `http://host/` and scopes to the whole host.
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Some(url.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some()
    {
        return Some(url.to_string());
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}

pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Build crawl options from the `crawl` subcommand's matches.
pub fn crawl_options_from_matches(
    sub_matches: &ArgMatches,
    seeds: Vec<String>,
) -> CrawlOptions {
    let max_pages = *sub_matches.get_one::<usize>("max-pages").unwrap_or(&30);
    let settle = *sub_matches.get_one::<u64>("settle").unwrap_or(&3);
    let timeout = *sub_matches.get_one::<u64>("timeout").unwrap_or(&20);
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = sub_matches
        .get_one::<String>("output")
        .map(|dir| shellexpand::tilde(dir).into_owned())
        .unwrap_or_else(|| ".".to_string());

    CrawlOptions {
        seeds,
        crawler: CrawlerConfig {
            max_pages,
            settle_delay: Duration::from_secs(settle),
            render_timeout: Duration::from_secs(timeout),
        },
        user_agent: sub_matches.get_one::<String>("user-agent").cloned(),
        renderer: if sub_matches.get_flag("browser") {
            RendererKind::Browser
        } else {
            RendererKind::Http
        },
        output: OutputLayout::in_dir(Path::new(&output), format),
        format,
        show_progress_bars: !sub_matches.get_flag("no-progress"),
    }
}

pub fn print_summary(summary: &CrawlSummary, layout: &OutputLayout) {
    println!("\n{} Crawl complete!\n", "✓".green().bold());
    println!("  Roots crawled:        {}", summary.roots_processed);
    println!("  Pages visited:        {}", summary.pages_visited);
    println!("  Distinct URLs:        {}", summary.urls_written);
    println!(
        "  Parameterized GET:    {}",
        summary.vuln_candidates.to_string().yellow()
    );
    println!(
        "  POST endpoints:       {}",
        summary.post_endpoints.to_string().yellow()
    );
    println!("  Directories:          {}", summary.directories);
    println!();
    println!(
        "{} Detailed report: {}",
        "→".blue(),
        layout.results_path.display().to_string().bright_white()
    );
    println!(
        "{} URL list:        {}",
        "→".blue(),
        layout.urls_path.display().to_string().bright_white()
    );
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");

    // Load URLs from source
    let urls = match load_urls_from_source(url, hosts_file) {
        Ok(urls) => urls,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let options = crawl_options_from_matches(sub_matches, urls);
    let layout = options.output.clone();

    if !quiet {
        println!("\n🕷️  Crawling {} seed(s)", options.seeds.len());
        println!("Max pages per root: {}", options.crawler.max_pages);
        println!("Settle delay: {}s", options.crawler.settle_delay.as_secs());
        println!("Page timeout: {}s\n", options.crawler.render_timeout.as_secs());
    }

    let progress_callback: CrawlProgressCallback = Arc::new(move |msg: String| {
        if !quiet {
            println!("{}", msg);
        }
    });

    match execute_crawl(options, Some(progress_callback)).await {
        Ok(summary) => {
            if !quiet {
                print_summary(&summary, &layout);
            }
        }
        Err(e) => {
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}
