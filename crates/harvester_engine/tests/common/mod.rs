#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use harvester_core::{CommentId, CommentPayload, CommentRecord, CrawlSession, PacingClock};
use harvester_engine::{
    CrawlEvent, CrawlSettings, Crawler, FailureKind, FetchError, ProgressSink, ReplyPage,
    ReplyPageRequest, ReplyPageSource, SessionHandle, ThreadContext, TopLevelSource,
};

pub fn payload(text: &str) -> CommentPayload {
    CommentPayload {
        author: "tester".to_string(),
        text: text.to_string(),
        timestamp: 1_700_000_000,
        likes: 0,
    }
}

pub fn root(id: u64) -> CommentRecord {
    CommentRecord::root(id, payload(&format!("root {id}")))
}

/// Settings with deterministic pacing and the given breaker threshold.
pub fn settings(breaker_threshold: u32, max_page_retries: u32) -> CrawlSettings {
    CrawlSettings {
        breaker_threshold,
        base_delay_ms: 1000,
        jitter_ratio: 0.0,
        exhaustion_poll_ms: 300,
        page_size: 20,
        max_page_retries,
        max_concurrent_roots: None,
        top_level_timeout_ms: None,
    }
}

pub fn session_for(settings: &CrawlSettings) -> SessionHandle {
    SessionHandle::new(CrawlSession::new(settings.breaker_threshold))
}

pub fn crawler(
    settings: CrawlSettings,
    session: SessionHandle,
    top_level: Arc<dyn TopLevelSource>,
    pages: Arc<dyn ReplyPageSource>,
    sink: Arc<RecordingSink>,
) -> Crawler {
    Crawler::new(
        settings,
        ThreadContext::new("1"),
        session,
        top_level,
        pages,
        sink,
    )
    .with_pacing(PacingClock::seeded(0.0, 7))
    .with_clock(Arc::new(|| "2024-01-01T00:00:00Z".to_string()))
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CrawlEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&CrawlEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|&e| predicate(e)).count()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: CrawlEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Surfaces `per_call` new roots per trigger until `cap` roots exist.
pub struct GrowingSource {
    session: SessionHandle,
    per_call: u64,
    cap: Option<u64>,
    next_id: AtomicU64,
    calls: AtomicUsize,
    exhausted: AtomicBool,
}

impl GrowingSource {
    pub fn new(session: SessionHandle, per_call: u64, cap: Option<u64>) -> Self {
        Self {
            session,
            per_call,
            cap,
            next_id: AtomicU64::new(1),
            calls: AtomicUsize::new(0),
            exhausted: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopLevelSource for GrowingSource {
    async fn trigger_more(&self) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut fresh = Vec::new();
        for _ in 0..self.per_call {
            let id = self.next_id.load(Ordering::SeqCst);
            if self.cap.is_some_and(|cap| id > cap) {
                break;
            }
            self.next_id.store(id + 1, Ordering::SeqCst);
            fresh.push(root(id));
        }
        self.session.ingest_roots(fresh);
        if self
            .cap
            .is_some_and(|cap| self.next_id.load(Ordering::SeqCst) > cap)
        {
            self.exhausted.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    fn rewind(&self) {
        self.next_id.store(1, Ordering::SeqCst);
        self.exhausted.store(false, Ordering::SeqCst);
    }
}

/// A trigger that never completes; exhaustion is flipped from outside.
#[derive(Default)]
pub struct StalledSource {
    pub exhausted: AtomicBool,
    calls: AtomicUsize,
}

impl StalledSource {
    pub fn exhausted() -> Self {
        Self {
            exhausted: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopLevelSource for StalledSource {
    async fn trigger_more(&self) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }
}

/// How the upstream answers for one root.
#[derive(Debug, Clone, Copy)]
pub struct RootScript {
    /// Reply count reported on every page.
    pub total: u64,
    /// Replies actually served before pages come back empty.
    pub available: u64,
    /// Leading requests that fail before the root behaves.
    pub failures: u32,
    pub always_fail: bool,
}

impl RootScript {
    pub fn replies(total: u64) -> Self {
        Self {
            total,
            available: total,
            failures: 0,
            always_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            total: 10,
            available: 10,
            failures: 0,
            always_fail: true,
        }
    }

    pub fn flaky(total: u64, failures: u32) -> Self {
        Self {
            failures,
            ..Self::replies(total)
        }
    }

    pub fn short(total: u64, available: u64) -> Self {
        Self {
            available,
            ..Self::replies(total)
        }
    }
}

/// Serves numbered replies per root according to its [`RootScript`].
pub struct ScriptedPages {
    scripts: Mutex<HashMap<CommentId, RootScript>>,
    fallback: Option<RootScript>,
    latency: Option<Duration>,
    root_latency: HashMap<CommentId, Duration>,
    calls: Mutex<Vec<(CommentId, u32)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedPages {
    pub fn new(scripts: impl IntoIterator<Item = (u64, RootScript)>) -> Self {
        Self {
            scripts: Mutex::new(
                scripts
                    .into_iter()
                    .map(|(id, script)| (CommentId(id), script))
                    .collect(),
            ),
            fallback: None,
            latency: None,
            root_latency: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_fallback(mut self, script: RootScript) -> Self {
        self.fallback = Some(script);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Overrides the shared latency for requests about `root`.
    pub fn with_root_latency(mut self, root: u64, latency: Duration) -> Self {
        self.root_latency.insert(CommentId(root), latency);
        self
    }

    pub fn calls(&self) -> Vec<(CommentId, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, root: u64) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter(|(id, _)| *id == CommentId(root))
            .map(|(_, page)| page)
            .collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_answer(&self, request: &ReplyPageRequest) -> Result<ReplyPage, FetchError> {
        let mut scripts = self.scripts.lock().unwrap();
        if !scripts.contains_key(&request.root) {
            match self.fallback {
                Some(fallback) => {
                    scripts.insert(request.root, fallback);
                }
                None => {
                    return Err(FetchError::new(FailureKind::HttpStatus(404), "unknown root"))
                }
            }
        }
        let script = scripts.get_mut(&request.root).expect("script present");
        if script.always_fail {
            return Err(FetchError::new(FailureKind::HttpStatus(503), "unavailable"));
        }
        if script.failures > 0 {
            script.failures -= 1;
            return Err(FetchError::new(FailureKind::Timeout, "timed out"));
        }

        let size = u64::from(request.page_size);
        let start = u64::from(request.page - 1) * size;
        let end = (start + size).min(script.available);
        let replies = (start..end)
            .map(|n| {
                CommentRecord::reply(
                    request.root.0 * 1000 + n,
                    request.root,
                    payload(&format!("reply {n}")),
                )
            })
            .collect();
        Ok(ReplyPage {
            replies,
            total: script.total,
        })
    }
}

#[async_trait]
impl ReplyPageSource for ScriptedPages {
    async fn fetch_page(&self, request: &ReplyPageRequest) -> Result<ReplyPage, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.root, request.page));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = self
            .root_latency
            .get(&request.root)
            .copied()
            .or(self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.next_answer(request)
    }
}
