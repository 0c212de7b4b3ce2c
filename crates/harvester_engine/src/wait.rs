use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::CrawlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    TimedOut,
    Cancelled,
}

/// Poll `predicate` every `interval` until it holds, `max_wait` elapses or
/// `cancel` fires. The predicate is checked once before the first sleep.
pub async fn wait_until<P>(
    predicate: P,
    interval: Duration,
    max_wait: Option<Duration>,
    cancel: &CancellationToken,
) -> WaitOutcome
where
    P: Fn() -> bool,
{
    let deadline = max_wait.map(|wait| Instant::now() + wait);
    loop {
        if predicate() {
            return WaitOutcome::Satisfied;
        }
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        let nap = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return WaitOutcome::TimedOut;
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        tokio::select! {
            _ = cancel.cancelled() => return WaitOutcome::Cancelled,
            _ = sleep(nap) => {}
        }
    }
}

/// Sleep for `delay` unless the crawl is cancelled first.
pub async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<(), CrawlError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(CrawlError::Cancelled),
        _ = sleep(delay) => Ok(()),
    }
}
