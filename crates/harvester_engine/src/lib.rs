//! Harvester engine: upstream adapters, acquisition strategies and the batch
//! orchestrator, plus the background handle the CLI drives.
mod config;
mod engine;
mod export;
mod fetch;
mod filename;
mod nested;
mod orchestrator;
mod persist;
mod session;
mod sink;
mod top_level;
mod trigger;
mod types;
mod wait;
mod wire;

pub use config::CrawlSettings;
pub use engine::EngineHandle;
pub use export::{exporter_for, ExportError, ExportFormat, ExportSummary, Exporter, JsonExporter, TableExporter};
pub use fetch::{ApiClient, FetchSettings, ReplyPageSource, ReqwestReplySource, DEFAULT_API_BASE};
pub use filename::export_filename;
pub use nested::NestedOutcome;
pub use orchestrator::{utc_clock, BatchReport, Clock, Crawler, RootFailure};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use session::SessionHandle;
pub use sink::{ChannelProgressSink, NullSink, ProgressSink};
pub use trigger::{MainListingTrigger, TopLevelSource};
pub use types::{
    CrawlError, CrawlEvent, FailureKind, FetchError, ReplyPage, ReplyPageRequest, ThreadContext,
};
pub use wait::{pause, wait_until, WaitOutcome};
