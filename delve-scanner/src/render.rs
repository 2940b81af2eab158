//! Page rendering collaborator.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Delve/0.1 (https://github.com/trapdoorsec/delve)";

/// A loaded page: where the browser ended up and the markup it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub final_url: String,
    pub html: String,
}

/// Loads a URL. The returned page stays open until [`LoadedPage::snapshot`]
/// reads its final URL and DOM, so scripts keep running while the crawler
/// waits out the settle delay.
///
/// The crawler bounds both phases with its own timeout.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<Box<dyn LoadedPage>>;
}

/// A navigated page whose DOM has not been read yet.
#[async_trait]
pub trait LoadedPage: Send {
    async fn snapshot(self: Box<Self>) -> Result<RenderedPage>;
}

/// Static markup is already final.
#[async_trait]
impl LoadedPage for RenderedPage {
    async fn snapshot(self: Box<Self>) -> Result<RenderedPage> {
        Ok(*self)
    }
}

/// Which [`Renderer`] a crawl uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RendererKind {
    /// Plain HTTP GET, no scripts
    #[default]
    Http,
    /// Headless Chromium, needs the `browser` feature
    Browser,
}

impl FromStr for RendererKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "http" => Ok(RendererKind::Http),
            "browser" | "chromium" | "chrome" => Ok(RendererKind::Browser),
            other => Err(ScanError::Browser(format!("unknown renderer '{}'", other))),
        }
    }
}

/// Build the renderer for `kind`. Launches Chromium for
/// [`RendererKind::Browser`].
pub async fn build_renderer(
    kind: RendererKind,
    timeout: Duration,
    user_agent: &str,
) -> Result<Box<dyn Renderer>> {
    match kind {
        RendererKind::Http => Ok(Box::new(HttpRenderer::with_user_agent(timeout, user_agent)?)),
        #[cfg(feature = "browser")]
        RendererKind::Browser => Ok(Box::new(
            crate::browser::BrowserRenderer::launch(timeout, user_agent).await?,
        )),
        #[cfg(not(feature = "browser"))]
        RendererKind::Browser => Err(ScanError::Browser(
            "this build has no browser support, rebuild with --features browser".to_string(),
        )),
    }
}

/// Check `url` before handing it to a client.
pub(crate) fn parse_target(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))
}

/// Plain HTTP renderer. Follows redirects and returns the response body
/// without running scripts.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_user_agent(timeout, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<Box<dyn LoadedPage>> {
        let target = parse_target(url)?;
        debug!("Fetching {}", url);

        let response = self.client.get(target).send().await?;
        let final_url = response.url().to_string();
        let status = response.status();

        if status.is_server_error() {
            return Err(ScanError::Render {
                url: url.to_string(),
                reason: format!("server responded {}", status),
            });
        }

        let html = response.text().await?;
        Ok(Box::new(RenderedPage { final_url, html }))
    }
}
