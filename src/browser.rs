use crate::config::Options;
use crate::errors::WorkflowError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const VIEWPORT_WIDTH: u32 = 1600;
const VIEWPORT_HEIGHT: u32 = 1200;

/// A launched Chromium instance plus the task draining its CDP event stream.
pub struct BrowserHandle {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Launch configuration for the session: fixed viewport, sandbox off for
/// containerized runs, headful unless asked otherwise, optional proxy.
pub fn build_config(opts: &Options) -> Result<BrowserConfig, WorkflowError> {
    let mut builder = BrowserConfig::builder()
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .no_sandbox();
    if !opts.headless {
        builder = builder.with_head();
    }
    if let Some(path) = &opts.chrome_path {
        builder = builder.chrome_executable(path);
    }
    if let Some(proxy) = opts.proxy_arg() {
        builder = builder.arg(proxy);
    }
    if opts.has_proxy_credentials() {
        warn!("proxy credentials cannot be injected via launch flags; the proxy must accept the bare connection");
    }
    builder.build().map_err(WorkflowError::Launch)
}

impl BrowserHandle {
    /// Launch Chromium per the run options and start the handler loop.
    pub async fn launch(opts: &Options) -> Result<Self, WorkflowError> {
        let config = build_config(opts)?;
        let (browser, mut handler) = Browser::launch(config).await?;

        // The CDP connection stalls unless something drains the handler.
        let handler_task = tokio::task::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("cdp handler loop ended");
                    break;
                }
            }
        });

        info!(
            headless = opts.headless,
            proxied = opts.proxy_arg().is_some(),
            "browser launched"
        );
        Ok(Self {
            browser,
            handler_task,
        })
    }

    pub async fn new_page(&self, url: &str) -> Result<Page, WorkflowError> {
        Ok(self.browser.new_page(url).await?)
    }

    /// Close the browser and join the handler task. Never fails; teardown
    /// problems are logged and swallowed so they cannot mask a run outcome.
    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!("browser close failed: {err}");
        }
        if let Err(err) = self.browser.wait().await {
            warn!("browser did not exit cleanly: {err}");
        }
        if let Err(err) = self.handler_task.await {
            warn!("handler task failed: {err}");
        }
        info!("browser closed");
    }
}

/// Write a diagnostic screenshot named `<epoch-millis>_<tag>.jpg` into `dir`.
pub async fn screenshot(page: &Page, dir: &Path, tag: &str) -> Result<PathBuf, WorkflowError> {
    tokio::fs::create_dir_all(dir).await?;
    let name = format!("{}_{}.jpg", chrono::Utc::now().timestamp_millis(), tag);
    let path = dir.join(name);
    page.save_screenshot(
        ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .build(),
        &path,
    )
    .await?;
    info!("saved screenshot {}", path.display());
    Ok(path)
}

/// Current cookie jar as the JSON array the collector's save endpoint takes.
pub async fn cookies_json(page: &Page) -> Result<serde_json::Value, WorkflowError> {
    let cookies = page.get_cookies().await?;
    Ok(serde_json::to_value(cookies)?)
}
