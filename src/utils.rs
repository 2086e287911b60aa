use crate::errors::WorkflowError;
use rand::Rng;
use std::time::Duration;

/// Jitter applied to every fixed wait, in milliseconds.
const JITTER_MS: u64 = 200;

/// Pick one candidate uniformly at random.
///
/// An empty slice is a hard error carrying `what` so the log names the set
/// that came up empty instead of panicking on an index.
pub fn sample<'a, T>(candidates: &'a [T], what: &str) -> Result<&'a T, WorkflowError> {
    if candidates.is_empty() {
        return Err(WorkflowError::EmptyCandidates(what.to_string()));
    }
    let idx = rand::rng().random_range(0..candidates.len());
    Ok(&candidates[idx])
}

/// Duration for a nominal wait with +/-200ms of uniform jitter, floored at 0.
pub fn jittered_ms(nominal: u64) -> u64 {
    let lo = nominal.saturating_sub(JITTER_MS);
    let hi = nominal + JITTER_MS;
    rand::rng().random_range(lo..=hi)
}

/// Sleep for a jittered version of `nominal` milliseconds.
///
/// The jitter is drawn before the await so the thread RNG is never held
/// across a suspension point.
pub async fn settle(nominal: u64) {
    let ms = jittered_ms(nominal);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
