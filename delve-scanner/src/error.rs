use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Render failed for {url}: {reason}")]
    Render { url: String, reason: String },

    #[error("Render of {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Browser error: {0}")]
    Browser(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
