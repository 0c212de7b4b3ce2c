use serde::{Deserialize, Serialize};

use crate::view_model::ProgressView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
        }
    }
}

/// Counters and log lines a front end renders while a crawl runs.
///
/// The error tally is session-wide: it counts every failed request since the
/// session began, across all roots and batches, and only [`Self::reset`]
/// clears it. Nested tasks run concurrently, so a per-task tally would have
/// no single owner to reset it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressState {
    discovered: usize,
    in_progress: bool,
    error_tally: u32,
    logs: Vec<LogEntry>,
    dirty: bool,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            discovered: self.discovered,
            in_progress: self.in_progress,
            error_tally: self.error_tally,
            log_count: self.logs.len(),
            last_log: self.logs.last().cloned(),
            dirty: self.dirty,
        }
    }

    pub fn set_in_progress(&mut self, in_progress: bool) {
        if self.in_progress != in_progress {
            self.in_progress = in_progress;
            self.dirty = true;
        }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn set_discovered(&mut self, discovered: usize) {
        if self.discovered != discovered {
            self.discovered = discovered;
            self.dirty = true;
        }
    }

    pub fn discovered(&self) -> usize {
        self.discovered
    }

    pub fn record_error(&mut self) {
        self.error_tally = self.error_tally.saturating_add(1);
        self.dirty = true;
    }

    pub fn error_tally(&self) -> u32 {
        self.error_tally
    }

    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
        self.dirty = true;
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Returns whether anything changed since the previous call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn reset(&mut self) {
        *self = Self {
            dirty: true,
            ..Self::default()
        };
    }
}
