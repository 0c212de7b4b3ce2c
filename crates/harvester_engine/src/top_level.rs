use harvester_logging::harvest_warn;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::Crawler;
use crate::wait::{pause, wait_until, WaitOutcome};
use crate::{CrawlError, CrawlEvent};

impl Crawler {
    /// Invoke the top-level source until at least `target` roots are stored or
    /// the source reports exhaustion. Returns the final root count.
    ///
    /// A source that neither grows nor signals exhaustion keeps this running
    /// until `cancel` fires or the configured top-level timeout elapses.
    pub async fn acquire_top_level(
        &self,
        target: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, CrawlError> {
        self.set_in_progress(true);
        let result = self.top_level_phase(target, cancel).await;
        self.set_in_progress(false);
        result
    }

    pub(crate) async fn top_level_phase(
        &self,
        target: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, CrawlError> {
        self.log(format!("Collecting top-level comments, target {target}"));
        let current = self.session.root_count();
        if current >= target {
            self.log(format!("Already have {current} top-level comments"));
            self.sink
                .emit(CrawlEvent::TopLevelComplete { count: current });
            return Ok(current);
        }

        let acquisition = async {
            tokio::select! {
                result = self.trigger_until(target, cancel) => result,
                outcome = wait_until(
                    || self.top_level.is_exhausted(),
                    self.settings.exhaustion_poll_interval(),
                    None,
                    cancel,
                ) => match outcome {
                    WaitOutcome::Cancelled => Err(CrawlError::Cancelled),
                    WaitOutcome::Satisfied | WaitOutcome::TimedOut => Ok(self.session.root_count()),
                },
            }
        };

        let result = match self.settings.top_level_timeout() {
            Some(limit) => tokio::time::timeout(limit, acquisition)
                .await
                .unwrap_or(Err(CrawlError::TopLevelTimedOut(limit))),
            None => acquisition.await,
        };

        self.publish_discovered();
        match &result {
            Ok(count) => {
                self.log(format!("Top-level collection finished with {count} comments"));
                self.sink
                    .emit(CrawlEvent::TopLevelComplete { count: *count });
            }
            Err(err) => self.log(format!("Top-level collection stopped: {err}")),
        }
        result
    }

    async fn trigger_until(
        &self,
        target: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, CrawlError> {
        loop {
            let triggered = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
                result = self.top_level.trigger_more() => result,
            };
            if let Err(err) = triggered {
                harvest_warn!("top-level trigger failed: {}", err);
                self.session.with(|s| s.progress_mut().record_error());
            }

            let size = self.session.root_count();
            self.publish_discovered();
            self.log(format!("Collected {size} top-level comments so far"));
            if size >= target || self.top_level.is_exhausted() {
                return Ok(size);
            }
            pause(self.next_delay(), cancel).await?;
        }
    }
}
