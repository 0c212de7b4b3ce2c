use std::fmt;

use serde::{Deserialize, Serialize};

/// Upstream identity of a single comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CommentId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// What the upstream says about a comment. The crawl logic never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentPayload {
    pub author: String,
    pub text: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub likes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: CommentId,
    /// Root the comment replies to; `None` for a top-level comment.
    pub parent: Option<CommentId>,
    pub payload: CommentPayload,
    /// Reply count advertised by the listing that surfaced this record, if any.
    pub reply_count_hint: Option<u64>,
    pub children_loaded: bool,
}

impl CommentRecord {
    pub fn root(id: u64, payload: CommentPayload) -> Self {
        Self {
            id: CommentId(id),
            parent: None,
            payload,
            reply_count_hint: None,
            children_loaded: false,
        }
    }

    pub fn reply(id: u64, parent: CommentId, payload: CommentPayload) -> Self {
        Self {
            id: CommentId(id),
            parent: Some(parent),
            payload,
            reply_count_hint: None,
            children_loaded: false,
        }
    }

    pub fn with_reply_count_hint(mut self, count: u64) -> Self {
        self.reply_count_hint = Some(count);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
