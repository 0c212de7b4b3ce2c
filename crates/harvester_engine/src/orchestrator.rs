use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use harvester_core::{CommentId, LogEntry, PacingClock};
use harvester_logging::harvest_info;
use tokio_util::sync::CancellationToken;

use crate::fetch::ReplyPageSource;
use crate::nested::NestedOutcome;
use crate::session::SessionHandle;
use crate::sink::ProgressSink;
use crate::trigger::TopLevelSource;
use crate::{CrawlError, CrawlEvent, CrawlSettings, ThreadContext};

/// Produces the timestamp stamped on progress log entries.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub fn utc_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().to_rfc3339())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFailure {
    pub root: CommentId,
    pub error: CrawlError,
}

/// Aggregate result of one [`Crawler::run_batch`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub target: usize,
    /// Top-level comments known when nested acquisition started.
    pub discovered: usize,
    pub selected: usize,
    /// Roots whose replies are fully loaded, in selection order.
    pub completed: Vec<CommentId>,
    /// Roots left without a complete reply list, in selection order.
    pub unresolved: Vec<CommentId>,
    pub failures: Vec<RootFailure>,
    pub upstream_unhealthy: bool,
    pub total_records: usize,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// One-line message for the user.
    pub fn summary(&self) -> String {
        if self.upstream_unhealthy {
            "upstream unhealthy, retry later".to_string()
        } else {
            format!("captured {} of target {}", self.completed.len(), self.target)
        }
    }
}

/// Drives both acquisition strategies against one crawl session.
pub struct Crawler {
    pub(crate) session: SessionHandle,
    pub(crate) context: ThreadContext,
    pub(crate) top_level: Arc<dyn TopLevelSource>,
    pub(crate) pages: Arc<dyn ReplyPageSource>,
    pub(crate) sink: Arc<dyn ProgressSink>,
    pub(crate) settings: CrawlSettings,
    pacing: Mutex<PacingClock>,
    clock: Clock,
}

impl Crawler {
    pub fn new(
        settings: CrawlSettings,
        context: ThreadContext,
        session: SessionHandle,
        top_level: Arc<dyn TopLevelSource>,
        pages: Arc<dyn ReplyPageSource>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let pacing = PacingClock::new(settings.jitter_ratio);
        Self {
            session,
            context,
            top_level,
            pages,
            sink,
            settings,
            pacing: Mutex::new(pacing),
            clock: utc_clock(),
        }
    }

    pub fn with_pacing(mut self, pacing: PacingClock) -> Self {
        self.pacing = Mutex::new(pacing);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn context(&self) -> &ThreadContext {
        &self.context
    }

    /// Make sure `target` roots are known, then load the replies of the first
    /// `target` roots concurrently.
    ///
    /// Individual root failures end up in the report. Only cancellation turns
    /// into an `Err`.
    pub async fn run_batch(
        &self,
        target: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, CrawlError> {
        self.set_in_progress(true);
        self.log(format!(
            "Collecting comments with replies, target {target} top-level comments"
        ));

        if self.session.root_count() < target {
            self.log("Not enough top-level comments yet, collecting more");
            match self.top_level_phase(target, cancel).await {
                Ok(_) => {}
                Err(CrawlError::Cancelled) => {
                    self.finish_cancelled();
                    return Err(CrawlError::Cancelled);
                }
                Err(err) => self.log(format!("Continuing with what was found: {err}")),
            }
        }

        let selected: Vec<CommentId> = self.session.with(|s| {
            s.store()
                .root_ids()
                .iter()
                .take(target)
                .copied()
                .collect()
        });
        let discovered = self.session.root_count();
        let width = self.settings.concurrency_for(selected.len());
        let count = selected.len();

        let mut outcomes: HashMap<CommentId, Result<NestedOutcome, CrawlError>> =
            stream::iter(selected.iter().copied().enumerate())
                .map(|(index, root)| async move {
                    self.log(format!(
                        "Collecting replies of comment {}/{}",
                        index + 1,
                        count
                    ));
                    (root, self.acquire_nested(root, cancel).await)
                })
                .buffer_unordered(width)
                .collect()
                .await;

        if cancel.is_cancelled() {
            self.finish_cancelled();
            return Err(CrawlError::Cancelled);
        }

        let mut report = BatchReport {
            target,
            discovered,
            selected: count,
            ..BatchReport::default()
        };
        self.session.with(|s| {
            for root in &selected {
                match outcomes.remove(root) {
                    Some(Ok(_)) if s.store().children_loaded(*root) => report.completed.push(*root),
                    Some(Err(error)) => {
                        report.failures.push(RootFailure { root: *root, error });
                        report.unresolved.push(*root);
                    }
                    _ => report.unresolved.push(*root),
                }
            }
            report.upstream_unhealthy = s.breaker().is_tripped();
            report.total_records = s.store().total_records();
        });

        self.log(format!("Batch complete: {}", report.summary()));
        self.publish_discovered();
        self.set_in_progress(false);
        self.sink.emit(CrawlEvent::BatchComplete(report.clone()));
        Ok(report)
    }

    /// Forget every collected comment, the breaker state and the progress log.
    pub fn reset(&self) {
        self.session.reset();
        self.top_level.rewind();
        self.sink.emit(CrawlEvent::SessionReset);
        self.log("Session reset");
    }

    fn finish_cancelled(&self) {
        self.log("Crawl cancelled");
        self.publish_discovered();
        self.set_in_progress(false);
    }

    pub(crate) fn log(&self, message: impl Into<String>) {
        let entry = LogEntry::new((self.clock)(), message);
        harvest_info!("{}", entry.message);
        self.session
            .with(|s| s.progress_mut().push_log(entry.clone()));
        self.sink.emit(CrawlEvent::Log(entry));
    }

    pub(crate) fn next_delay(&self) -> Duration {
        let base = self.settings.base_delay();
        self.pacing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_delay(base)
    }

    pub(crate) fn publish_discovered(&self) {
        let discovered = self.session.with(|s| {
            let size = s.store().size();
            s.progress_mut().set_discovered(size);
            size
        });
        self.sink.emit(CrawlEvent::Discovered(discovered));
    }

    pub(crate) fn set_in_progress(&self, in_progress: bool) {
        self.session
            .with(|s| s.progress_mut().set_in_progress(in_progress));
        self.sink.emit(CrawlEvent::InProgress(in_progress));
    }
}
