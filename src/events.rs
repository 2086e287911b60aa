use crate::errors::WorkflowError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFinished, EventResponseReceived, GetResponseBodyParams,
};
use chromiumoxide::Page;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Single deadline applied to every awaited page condition. Mirrors the
/// driver's own navigation default; nothing else is layered on top.
pub const RESPONSE_DEADLINE: Duration = Duration::from_secs(30);

/// A network response captured off the wire, identified well enough to fetch
/// its body later.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub url: String,
    pub status: i64,
    request_id: String,
}

/// Watches a page's network traffic. Must be attached before the action that
/// triggers the traffic, otherwise the interesting response can slip past
/// unobserved; events buffer from attachment onward.
pub struct ResponseWatcher {
    responses: BoxStream<'static, (String, i64, String)>,
    finished: BoxStream<'static, String>,
}

impl ResponseWatcher {
    pub async fn attach(page: &Page) -> Result<Self, WorkflowError> {
        let responses = page
            .event_listener::<EventResponseReceived>()
            .await?
            .map(|ev| {
                (
                    ev.response.url.clone(),
                    ev.response.status,
                    ev.request_id.inner().to_string(),
                )
            })
            .boxed();
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|ev| ev.request_id.inner().to_string())
            .boxed();
        Ok(Self {
            responses,
            finished,
        })
    }

    /// First buffered-or-future response whose URL satisfies `pred`, within
    /// the deadline. `what` names the wait in the timeout error.
    pub async fn wait_matching<F>(
        &mut self,
        what: &str,
        pred: F,
    ) -> Result<CapturedResponse, WorkflowError>
    where
        F: Fn(&str) -> bool,
    {
        let scan = async {
            while let Some((url, status, request_id)) = self.responses.next().await {
                if pred(&url) {
                    debug!(%url, status, "matched response");
                    return Some(CapturedResponse {
                        url,
                        status,
                        request_id,
                    });
                }
            }
            None
        };
        match timeout(RESPONSE_DEADLINE, scan).await {
            Ok(Some(captured)) => Ok(captured),
            _ => Err(WorkflowError::ResponseTimeout(what.to_string())),
        }
    }

    async fn wait_finished(&mut self, captured: &CapturedResponse) -> Result<(), WorkflowError> {
        let scan = async {
            while let Some(request_id) = self.finished.next().await {
                if request_id == captured.request_id {
                    return true;
                }
            }
            false
        };
        match timeout(RESPONSE_DEADLINE, scan).await {
            Ok(true) => Ok(()),
            _ => Err(WorkflowError::ResponseTimeout(format!(
                "body of {}",
                captured.url
            ))),
        }
    }

    /// Fetch and parse the captured response's body as JSON. Waits for the
    /// load to finish first; the body is not retrievable before that.
    pub async fn body_json(
        &mut self,
        page: &Page,
        captured: &CapturedResponse,
    ) -> Result<serde_json::Value, WorkflowError> {
        self.wait_finished(captured).await?;
        let resp = page
            .execute(GetResponseBodyParams::new(captured.request_id.clone()))
            .await?;
        let raw = if resp.result.base64_encoded {
            match BASE64.decode(resp.result.body.as_bytes()) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(err) => {
                    warn!("base64 decode of {} failed: {err}", captured.url);
                    resp.result.body.clone()
                }
            }
        } else {
            resp.result.body.clone()
        };
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Await the page settling after a navigation-triggering action, bounded by
/// the same deadline as response waits.
pub async fn wait_for_navigation(page: &Page, what: &str) -> Result<(), WorkflowError> {
    let _ = timeout(RESPONSE_DEADLINE, page.wait_for_navigation())
        .await
        .map_err(|_| WorkflowError::ResponseTimeout(format!("navigation after {what}")))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn watcher(
        responses: Vec<(String, i64, String)>,
        finished: Vec<String>,
    ) -> ResponseWatcher {
        ResponseWatcher {
            responses: stream::iter(responses).chain(stream::pending()).boxed(),
            finished: stream::iter(finished).chain(stream::pending()).boxed(),
        }
    }

    fn resp(url: &str, id: &str) -> (String, i64, String) {
        (url.to_string(), 200, id.to_string())
    }

    #[tokio::test]
    async fn wait_matching_skips_unrelated_traffic() {
        let mut w = watcher(
            vec![
                resp("https://site/styles.css", "1"),
                resp("https://site/pl/shoes", "2"),
            ],
            vec![],
        );
        let captured = w
            .wait_matching("category listing", |url| url.contains("/pl/"))
            .await
            .unwrap();
        assert_eq!(captured.url, "https://site/pl/shoes");
        assert_eq!(captured.request_id, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_matching_times_out_when_nothing_matches() {
        let mut w = watcher(vec![resp("https://site/other", "1")], vec![]);
        let err = w
            .wait_matching("category listing", |url| url.contains("/pl/"))
            .await
            .unwrap_err();
        match err {
            WorkflowError::ResponseTimeout(what) => assert_eq!(what, "category listing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn finished_events_buffered_before_the_wait_still_count() {
        let mut w = watcher(
            vec![resp("https://site/api", "9")],
            vec!["7".to_string(), "9".to_string()],
        );
        let captured = w.wait_matching("api", |url| url.contains("api")).await.unwrap();
        w.wait_finished(&captured).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn missing_finished_event_times_out() {
        let mut w = watcher(vec![resp("https://site/api", "9")], vec!["7".to_string()]);
        let captured = w.wait_matching("api", |url| url.contains("api")).await.unwrap();
        let err = w.wait_finished(&captured).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ResponseTimeout(_)));
    }
}
