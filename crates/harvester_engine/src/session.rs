use std::sync::{Arc, Mutex, PoisonError};

use harvester_core::{CommentRecord, CrawlSession, ExportTree, ProgressView};

/// Shared handle to the crawl session.
///
/// Every accessor takes the lock for the duration of a synchronous closure,
/// so the lock is never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<CrawlSession>>,
}

impl SessionHandle {
    pub fn new(session: CrawlSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut CrawlSession) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn root_count(&self) -> usize {
        self.with(|s| s.store().size())
    }

    /// Store top-level comments; returns how many were new.
    pub fn ingest_roots(&self, records: impl IntoIterator<Item = CommentRecord>) -> usize {
        self.with(|s| {
            records
                .into_iter()
                .map(|record| s.ingest_root(record))
                .filter(|inserted| *inserted)
                .count()
        })
    }

    pub fn breaker_tripped(&self) -> bool {
        self.with(|s| s.breaker().is_tripped())
    }

    pub fn progress(&self) -> ProgressView {
        self.with(|s| s.progress().view())
    }

    pub fn export_tree(&self, max_roots: Option<usize>) -> ExportTree {
        self.with(|s| s.export_tree(max_roots))
    }

    pub fn reset(&self) {
        self.with(CrawlSession::reset);
    }
}
