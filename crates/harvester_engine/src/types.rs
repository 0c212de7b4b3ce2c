use std::fmt;
use std::time::Duration;

use harvester_core::{CommentId, CommentRecord, LogEntry};

use crate::export::ExportSummary;
use crate::orchestrator::BatchReport;

/// Opaque identifier of the thread (video, post) whose comments are harvested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadContext {
    pub oid: String,
}

impl ThreadContext {
    pub fn new(oid: impl Into<String>) -> Self {
        Self { oid: oid.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPageRequest {
    pub context: ThreadContext,
    pub root: CommentId,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

/// One page of the nested reply listing for a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPage {
    pub replies: Vec<CommentRecord>,
    /// Reply count the upstream reports for the whole root.
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    Log(LogEntry),
    Discovered(usize),
    InProgress(bool),
    UpstreamUnhealthy,
    TopLevelComplete { count: usize },
    BatchComplete(BatchReport),
    /// A command ended early; carries the reason.
    Stopped(CrawlError),
    ExportCompleted(Result<ExportSummary, String>),
    SessionReset,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
    MalformedBody,
    /// Non-zero `code` in the API envelope.
    UpstreamCode(i64),
    /// A page that reports zero replies for the root.
    EmptyTotal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::MalformedBody => write!(f, "malformed response body"),
            FailureKind::UpstreamCode(code) => write!(f, "upstream code {code}"),
            FailureKind::EmptyTotal => write!(f, "empty reply total"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrawlError {
    #[error("upstream unhealthy, please retry later")]
    UpstreamUnhealthy,
    #[error("crawl cancelled")]
    Cancelled,
    #[error("top-level acquisition timed out after {0:?}")]
    TopLevelTimedOut(Duration),
    #[error("gave up on replies of {root} at page {page} after {attempts} failed attempts")]
    PageRetriesExhausted {
        root: CommentId,
        page: u32,
        attempts: u32,
    },
}
