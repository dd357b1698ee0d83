use crate::valuation::config::BrowserSettings;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("content extraction failed: {0}")]
    Content(String),
}

/// Starts isolated rendering sessions. Each session belongs to exactly one
/// lookup and must be handed back through [`RenderSession::close`].
#[async_trait]
pub trait Renderer: Send + Sync {
    type Session: RenderSession;

    async fn open(&self) -> Result<Self::Session, RenderError>;
}

#[async_trait]
pub trait RenderSession: Send + Sized {
    async fn goto(&mut self, url: &str) -> Result<(), RenderError>;

    /// Returns `Ok(false)` when `selector` did not show up within `timeout`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, RenderError>;

    async fn content(&mut self) -> Result<String, RenderError>;

    async fn close(self);
}

/// Headless Chromium, one browser process per session.
pub struct ChromiumRenderer {
    settings: BrowserSettings,
}

impl ChromiumRenderer {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    events: JoinHandle<()>,
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    type Session = ChromiumSession;

    async fn open(&self) -> Result<ChromiumSession, RenderError> {
        let mut builder = BrowserConfig::builder();
        if let Some(path) = &self.settings.executable {
            builder = builder.chrome_executable(path);
        }
        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(RenderError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| RenderError::Launch(err.to_string()))?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        match browser.new_page("about:blank").await {
            Ok(page) => {
                debug!(target = "media.valuation", "browser_session_opened");
                Ok(ChromiumSession {
                    browser,
                    page,
                    events,
                })
            }
            Err(err) => {
                let _ = browser.close().await;
                events.abort();
                Err(RenderError::Launch(err.to_string()))
            }
        }
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<(), RenderError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|err| RenderError::Navigation(err.to_string()))
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, RenderError> {
        let page = &self.page;
        // An empty match list means "not rendered yet"; a protocol error means the page is gone.
        let poll = async {
            loop {
                let found = page
                    .find_elements(selector)
                    .await
                    .map_err(|err| RenderError::Content(err.to_string()))?;
                if !found.is_empty() {
                    return Ok::<(), RenderError>(());
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };
        match tokio::time::timeout(timeout, poll).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(err)) => Err(err),
            Err(_) => Ok(false),
        }
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.page
            .content()
            .await
            .map_err(|err| RenderError::Content(err.to_string()))
    }

    async fn close(self) {
        let ChromiumSession {
            mut browser,
            page,
            events,
        } = self;
        if let Err(err) = page.close().await {
            warn!(target = "media.valuation", error = %err, "page_close_failed");
        }
        if let Err(err) = browser.close().await {
            warn!(target = "media.valuation", error = %err, "browser_close_failed");
        }
        let _ = browser.wait().await;
        events.abort();
        debug!(target = "media.valuation", "browser_session_closed");
    }
}
