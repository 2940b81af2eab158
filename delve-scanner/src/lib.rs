#[cfg(feature = "browser")]
pub mod browser;
pub mod classify;
pub mod crawler;
pub mod error;
pub mod frontier;
pub mod parse;
pub mod render;
pub mod result;
pub mod scope;

#[cfg(feature = "browser")]
pub use browser::BrowserRenderer;
pub use classify::Classification;
pub use crawler::{Crawler, CrawlerConfig, ProgressCallback};
pub use error::ScanError;
pub use parse::{HtmlParser, Parser};
pub use render::{HttpRenderer, LoadedPage, Renderer, RendererKind, build_renderer};
pub use result::{RootResult, UrlSet};
