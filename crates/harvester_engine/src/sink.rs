use std::sync::mpsc;

use crate::CrawlEvent;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: CrawlEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<CrawlEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<CrawlEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: CrawlEvent) {
        let _ = self.tx.send(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: CrawlEvent) {}
}
