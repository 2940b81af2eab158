//! Headless Chromium renderer.
//!
//! Every URL gets a fresh tab. Navigation waits for the load event, then the
//! tab stays open until the crawler takes its snapshot, so links inserted by
//! scripts during the settle delay end up in the DOM that gets parsed.

use crate::error::{Result, ScanError};
use crate::render::{LoadedPage, RenderedPage, Renderer, parse_target};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct BrowserRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    user_agent: String,
    nav_timeout: Duration,
}

impl BrowserRenderer {
    /// Start a headless Chromium found on the local machine.
    pub async fn launch(nav_timeout: Duration, user_agent: &str) -> Result<Self> {
        let config = BrowserConfig::builder()
            .request_timeout(nav_timeout)
            .build()
            .map_err(ScanError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScanError::Browser(format!("could not launch Chromium: {}", e)))?;

        // CDP events must be drained for the browser to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        info!("Launched headless Chromium");
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            user_agent: user_agent.to_string(),
            nav_timeout,
        })
    }

    async fn navigate(&self, page: &Page, url: &str) -> Result<()> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(|e| render_error(url, e))?;

        debug!("Navigating to {}", url);
        tokio::time::timeout(self.nav_timeout, page.goto(url))
            .await
            .map_err(|_| ScanError::Timeout {
                url: url.to_string(),
                timeout: self.nav_timeout,
            })?
            .map_err(|e| render_error(url, e))?;
        Ok(())
    }
}

impl Drop for BrowserRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn render(&self, url: &str) -> Result<Box<dyn LoadedPage>> {
        parse_target(url)?;

        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| render_error(url, e))?
        };

        if let Err(e) = self.navigate(&page, url).await {
            close_page(page).await;
            return Err(e);
        }

        Ok(Box::new(BrowserPage {
            page,
            requested: url.to_string(),
        }))
    }
}

/// An open tab, closed once its DOM has been read.
struct BrowserPage {
    page: Page,
    requested: String,
}

#[async_trait]
impl LoadedPage for BrowserPage {
    async fn snapshot(self: Box<Self>) -> Result<RenderedPage> {
        let BrowserPage { page, requested } = *self;

        let read = async {
            let final_url = page.url().await?.unwrap_or_else(|| requested.clone());
            let html = page.content().await?;
            Ok::<_, CdpError>(RenderedPage { final_url, html })
        }
        .await;

        close_page(page).await;
        read.map_err(|e| render_error(&requested, e))
    }
}

async fn close_page(page: Page) {
    if let Err(e) = page.close().await {
        debug!("Could not close tab: {}", e);
    }
}

fn render_error(url: &str, e: CdpError) -> ScanError {
    ScanError::Render {
        url: url.to_string(),
        reason: e.to_string(),
    }
}
