pub mod crawl;
pub mod error;
pub mod report;

use colored::Colorize;

pub use crawl::{CrawlOptions, CrawlSummary, Orchestrator, execute_crawl};
pub use error::CrawlError;
pub use report::{CrawlSink, FileSink, OutputLayout, ReportFormat};

const BANNER: &str = r#"
     _      _
  __| | ___| |_   _____
 / _` |/ _ \ \ \ / / _ \
| (_| |  __/ |\ V /  __/
 \__,_|\___|_| \_/ \___|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "scope-bounded discovery crawler".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
