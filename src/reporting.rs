use crate::config::Options;
use crate::errors::WorkflowError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Delivery seam for workflow telemetry.
///
/// `fire` is awaited so a join can require the report to land before the
/// step completes; `notify` returns immediately and delivers on a detached
/// task. Neither surfaces failures to the caller: a dead reporting endpoint
/// must not take the workflow down with it.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// GET `<base>/<path>`, awaited. Failures are logged and absorbed.
    async fn fire(&self, path: &str);

    /// GET `<base>/<path>` without waiting for the answer.
    fn notify(&self, path: &str);

    /// POST `<base>/<path>` with a JSON body, awaited, same absorb policy.
    async fn post_json(&self, path: &str, body: serde_json::Value);
}

/// Reporter against the local collector at `http://127.0.0.1:<port>/`.
pub struct HttpReporter {
    client: Client,
    base: Url,
}

impl HttpReporter {
    pub fn new(opts: &Options) -> Result<Self, WorkflowError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let base = Url::parse(&opts.report_base())?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Option<Url> {
        match self.base.join(path) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!("unusable report path {path:?}: {err}");
                None
            }
        }
    }
}

async fn get_absorbed(client: &Client, url: Url) {
    match client.get(url.clone()).send().await {
        Ok(resp) if resp.status().is_success() => debug!("reported {url}"),
        Ok(resp) => warn!("report {url} answered {}", resp.status()),
        Err(err) => warn!("report {url} failed: {err}"),
    }
}

#[async_trait]
impl ReportSink for HttpReporter {
    async fn fire(&self, path: &str) {
        if let Some(url) = self.endpoint(path) {
            get_absorbed(&self.client, url).await;
        }
    }

    fn notify(&self, path: &str) {
        if let Some(url) = self.endpoint(path) {
            let client = self.client.clone();
            tokio::spawn(async move {
                get_absorbed(&client, url).await;
            });
        }
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) {
        let Some(url) = self.endpoint(path) else {
            return;
        };
        match self.client.post(url.clone()).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => debug!("posted {url}"),
            Ok(resp) => warn!("post {url} answered {}", resp.status()),
            Err(err) => warn!("post {url} failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn builds_against_the_configured_port() {
        let opts = Options::parse_from(["couponfarm", "--server-port", "9123"]);
        let reporter = HttpReporter::new(&opts).unwrap();
        let url = reporter.endpoint("input_promo_code/TEN_OFF").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9123/input_promo_code/TEN_OFF"
        );
    }
}
