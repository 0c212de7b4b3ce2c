use crate::tree::{build_export_tree, ExportTree};
use crate::{CircuitBreaker, CommentId, CommentRecord, CommentStore, ProgressState};

/// Everything one crawl mutates: the comment store, the shared breaker and
/// the progress counters. Starting a new crawl means [`CrawlSession::reset`].
#[derive(Debug, Clone, Default)]
pub struct CrawlSession {
    store: CommentStore,
    breaker: CircuitBreaker,
    progress: ProgressState,
}

impl CrawlSession {
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            store: CommentStore::new(),
            breaker: CircuitBreaker::new(failure_threshold),
            progress: ProgressState::new(),
        }
    }

    pub fn store(&self) -> &CommentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CommentStore {
        &mut self.store
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn breaker_mut(&mut self) -> &mut CircuitBreaker {
        &mut self.breaker
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressState {
        &mut self.progress
    }

    /// Store a top-level comment and refresh the discovered counter.
    pub fn ingest_root(&mut self, record: CommentRecord) -> bool {
        debug_assert!(record.is_root());
        let inserted = self.store.upsert(record);
        self.progress.set_discovered(self.store.size());
        inserted
    }

    /// Store one page of replies under `root` and return the distinct child
    /// count afterwards.
    pub fn merge_replies(
        &mut self,
        root: CommentId,
        replies: impl IntoIterator<Item = CommentRecord>,
    ) -> usize {
        for reply in replies {
            let id = reply.id;
            self.store.upsert(reply);
            self.store.append_child(root, id);
        }
        self.store.child_count(root)
    }

    pub fn export_tree(&self, max_roots: Option<usize>) -> ExportTree {
        build_export_tree(&self.store, max_roots)
    }

    pub fn reset(&mut self) {
        self.store.clear();
        self.breaker.reset();
        self.progress.reset();
    }
}
