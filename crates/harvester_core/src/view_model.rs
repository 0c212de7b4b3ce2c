use crate::LogEntry;

/// Snapshot of crawl progress handed to a front end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressView {
    pub discovered: usize,
    pub in_progress: bool,
    pub error_tally: u32,
    pub log_count: usize,
    pub last_log: Option<LogEntry>,
    pub dirty: bool,
}
