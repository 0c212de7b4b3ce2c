use harvester_core::CommentId;
use harvester_logging::{harvest_debug, harvest_warn};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::Crawler;
use crate::wait::pause;
use crate::{CrawlError, CrawlEvent, FailureKind, FetchError, ReplyPage, ReplyPageRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedOutcome {
    /// The root is not in the store.
    Skipped,
    /// Replies were loaded earlier in this session.
    AlreadyLoaded,
    Loaded { children: usize, pages: u32 },
}

impl Crawler {
    /// Page through the replies of `root` until the stored child count reaches
    /// the total reported by the upstream.
    ///
    /// Pages are requested strictly in order. A failed page is retried in
    /// place up to [`CrawlSettings::page_attempts`] times; every failure also
    /// counts toward the session breaker, and a tripped breaker rejects any
    /// further request. A page that lands after the breaker tripped is kept in
    /// the store but the root is not marked loaded.
    ///
    /// [`CrawlSettings::page_attempts`]: crate::CrawlSettings::page_attempts
    pub async fn acquire_nested(
        &self,
        root: CommentId,
        cancel: &CancellationToken,
    ) -> Result<NestedOutcome, CrawlError> {
        let ready = self.session.with(|s| match s.store().get(root) {
            None => Some(NestedOutcome::Skipped),
            Some(record) if record.children_loaded => Some(NestedOutcome::AlreadyLoaded),
            Some(record) if record.reply_count_hint == Some(0) => {
                s.store_mut().mark_children_loaded(root);
                Some(NestedOutcome::Loaded {
                    children: 0,
                    pages: 0,
                })
            }
            Some(_) => None,
        });
        if let Some(outcome) = ready {
            harvest_debug!("replies of {} need no requests: {:?}", root, outcome);
            return Ok(outcome);
        }

        let max_attempts = self.settings.page_attempts();
        let mut page = 1;
        let mut attempts = 0;
        let mut pages_merged = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(CrawlError::Cancelled);
            }
            if self.session.breaker_tripped() {
                return Err(CrawlError::UpstreamUnhealthy);
            }

            let request = ReplyPageRequest {
                context: self.context.clone(),
                root,
                page,
                page_size: self.settings.page_size,
            };
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
                result = self.pages.fetch_page(&request) => result,
            };

            match fetched.and_then(require_total) {
                Ok(reply_page) => {
                    attempts = 0;
                    pages_merged += 1;
                    let surfaced = reply_page.replies.len();
                    let total = reply_page.total;
                    let (children, done, late) = self.session.with(|s| {
                        let late = s.breaker().is_tripped();
                        let children = s.merge_replies(root, reply_page.replies);
                        if late {
                            return (children, false, true);
                        }
                        s.breaker_mut().record_success();
                        // an empty page means the upstream has nothing more to give
                        let done = children as u64 >= total || surfaced == 0;
                        if done {
                            s.store_mut().mark_children_loaded(root);
                        }
                        (children, done, false)
                    });
                    if late {
                        harvest_debug!(
                            "root {} page {} arrived after the breaker tripped; {} replies kept",
                            root,
                            page,
                            children
                        );
                        return Err(CrawlError::UpstreamUnhealthy);
                    }
                    harvest_debug!(
                        "root {} page {}: {} replies, {}/{} collected",
                        root,
                        page,
                        surfaced,
                        children,
                        total
                    );
                    if done {
                        return Ok(NestedOutcome::Loaded {
                            children,
                            pages: pages_merged,
                        });
                    }
                    page += 1;
                }
                Err(err) => {
                    attempts += 1;
                    let (was_tripped, tripped) = self.session.with(|s| {
                        s.progress_mut().record_error();
                        let was_tripped = s.breaker().is_tripped();
                        (was_tripped, s.breaker_mut().record_failure())
                    });
                    harvest_warn!(
                        "root {} page {} failed (attempt {}/{}): {}",
                        root,
                        page,
                        attempts,
                        max_attempts,
                        err
                    );
                    if tripped {
                        if !was_tripped {
                            self.log("Upstream unhealthy, please retry later");
                            self.sink.emit(CrawlEvent::UpstreamUnhealthy);
                        }
                        return Err(CrawlError::UpstreamUnhealthy);
                    }
                    if attempts >= max_attempts {
                        self.log(format!(
                            "Giving up on replies of comment {root} at page {page}"
                        ));
                        return Err(CrawlError::PageRetriesExhausted {
                            root,
                            page,
                            attempts,
                        });
                    }
                }
            }

            pause(self.next_delay(), cancel).await?;
        }
    }
}

fn require_total(page: ReplyPage) -> Result<ReplyPage, FetchError> {
    if page.total == 0 {
        return Err(FetchError::new(
            FailureKind::EmptyTotal,
            "upstream reported zero replies",
        ));
    }
    Ok(page)
}
