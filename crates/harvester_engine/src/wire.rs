//! JSON shapes of the comment API.
use harvester_core::{CommentId, CommentPayload, CommentRecord};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyListData {
    pub page: Option<PageInfo>,
    #[serde(default)]
    pub replies: Option<Vec<WireReply>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageInfo {
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MainListData {
    pub cursor: Option<Cursor>,
    #[serde(default)]
    pub replies: Option<Vec<WireReply>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Cursor {
    #[serde(default)]
    pub is_end: bool,
    #[serde(default)]
    pub next: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireReply {
    pub rpid: u64,
    #[serde(default)]
    pub rcount: Option<u64>,
    #[serde(default)]
    pub ctime: i64,
    #[serde(default)]
    pub like: u64,
    pub member: Option<WireMember>,
    pub content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMember {
    #[serde(default)]
    pub uname: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireContent {
    #[serde(default)]
    pub message: String,
}

impl WireReply {
    fn payload(&self) -> CommentPayload {
        CommentPayload {
            author: self
                .member
                .as_ref()
                .map(|m| m.uname.clone())
                .unwrap_or_default(),
            text: self
                .content
                .as_ref()
                .map(|c| c.message.clone())
                .unwrap_or_default(),
            timestamp: self.ctime,
            likes: self.like,
        }
    }

    pub fn into_root(self) -> CommentRecord {
        let record = CommentRecord::root(self.rpid, self.payload());
        match self.rcount {
            Some(count) => record.with_reply_count_hint(count),
            None => record,
        }
    }

    pub fn into_reply(self, root: CommentId) -> CommentRecord {
        CommentRecord::reply(self.rpid, root, self.payload())
    }
}
