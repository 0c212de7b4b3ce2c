//! Harvester core: comment store, crawl session state and the pure helpers the
//! acquisition strategies share.
mod breaker;
mod pacing;
mod progress;
mod record;
mod session;
mod store;
mod tree;
mod view_model;

pub use breaker::{CircuitBreaker, DEFAULT_FAILURE_THRESHOLD};
pub use pacing::{PacingClock, DEFAULT_BASE_DELAY, DEFAULT_JITTER_RATIO};
pub use progress::{LogEntry, ProgressState};
pub use record::{CommentId, CommentPayload, CommentRecord};
pub use session::CrawlSession;
pub use store::CommentStore;
pub use tree::{build_export_tree, ExportNode, ExportTree, SessionMetadata};
pub use view_model::ProgressView;
