use delve_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// Missing or unusable seed input. Raised before anything is crawled.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scanner error: {0}")]
    Scan(#[from] ScanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
