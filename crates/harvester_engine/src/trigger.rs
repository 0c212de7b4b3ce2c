use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use harvester_logging::harvest_debug;

use crate::fetch::ApiClient;
use crate::session::SessionHandle;
use crate::wire::MainListData;
use crate::{FetchError, ThreadContext};

/// Whatever makes the upstream surface more top-level comments.
///
/// Implementations grow the session store themselves; the acquisition
/// strategy only watches the store size and [`TopLevelSource::is_exhausted`].
#[async_trait::async_trait]
pub trait TopLevelSource: Send + Sync {
    async fn trigger_more(&self) -> Result<(), FetchError>;

    /// `true` once the upstream has nothing further to surface.
    fn is_exhausted(&self) -> bool;

    /// Start over from the beginning, e.g. after a session reset.
    fn rewind(&self) {}
}

/// Walks the cursor-paged `x/v2/reply/main` listing and ingests each page of
/// roots into the session.
pub struct MainListingTrigger {
    api: ApiClient,
    context: ThreadContext,
    session: SessionHandle,
    next_cursor: AtomicU64,
    exhausted: AtomicBool,
}

impl MainListingTrigger {
    pub fn new(api: ApiClient, context: ThreadContext, session: SessionHandle) -> Self {
        Self {
            api,
            context,
            session,
            next_cursor: AtomicU64::new(0),
            exhausted: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl TopLevelSource for MainListingTrigger {
    async fn trigger_more(&self) -> Result<(), FetchError> {
        if self.is_exhausted() {
            return Ok(());
        }
        let cursor = self.next_cursor.load(Ordering::SeqCst);
        let url = self.api.endpoint(
            "/x/v2/reply/main",
            &[
                ("type", "1".to_string()),
                ("oid", self.context.oid.clone()),
                ("mode", "3".to_string()),
                ("next", cursor.to_string()),
            ],
        )?;
        let data: MainListData = self.api.get_data(url).await?;

        let replies = data.replies.unwrap_or_default();
        let surfaced = replies.len();
        let added = self
            .session
            .ingest_roots(replies.into_iter().map(|reply| reply.into_root()));

        match data.cursor {
            Some(next) => {
                self.next_cursor.store(next.next, Ordering::SeqCst);
                if next.is_end {
                    self.exhausted.store(true, Ordering::SeqCst);
                }
            }
            None => self.exhausted.store(true, Ordering::SeqCst),
        }
        if surfaced == 0 {
            self.exhausted.store(true, Ordering::SeqCst);
        }

        harvest_debug!(
            "main listing cursor={} surfaced={} new={} exhausted={}",
            cursor,
            surfaced,
            added,
            self.is_exhausted()
        );
        Ok(())
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    fn rewind(&self) {
        self.next_cursor.store(0, Ordering::SeqCst);
        self.exhausted.store(false, Ordering::SeqCst);
    }
}
