use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Run `op` up to `attempts` times, sequentially and without backoff,
/// returning the first success or the last error.
///
/// `op` builds a fresh future per attempt. Any pacing between attempts is the
/// operation's own business. `attempts` of 0 still runs once.
pub async fn retry<T, E, F, Fut>(attempts: usize, what: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    for attempt in 1..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!("{what} attempt {attempt}/{attempts} failed: {err}");
            }
        }
    }
    op().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn first_success_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(3, "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(5, "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("transient {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_the_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(3, "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("boom {n}")) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "boom 3");
    }

    #[tokio::test]
    async fn success_on_the_final_attempt_counts() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = retry(2, "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 2 {
                    Err("first".to_string())
                } else {
                    Ok("made it")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "made it");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
