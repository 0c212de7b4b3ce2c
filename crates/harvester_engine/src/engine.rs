use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use harvester_core::{CrawlSession, ProgressView, SessionMetadata};
use harvester_logging::harvest_error;
use tokio_util::sync::CancellationToken;

use crate::export::{exporter_for, ExportFormat, ExportSummary};
use crate::fetch::{ApiClient, FetchSettings, ReplyPageSource, ReqwestReplySource};
use crate::orchestrator::Crawler;
use crate::session::SessionHandle;
use crate::sink::ChannelProgressSink;
use crate::trigger::{MainListingTrigger, TopLevelSource};
use crate::{CrawlEvent, CrawlSettings, FetchError, ThreadContext};

enum EngineCommand {
    RunBatch {
        target: usize,
        cancel: CancellationToken,
    },
    AcquireTopLevel {
        target: usize,
        cancel: CancellationToken,
    },
    Export {
        format: ExportFormat,
        output_dir: PathBuf,
        metadata: SessionMetadata,
        max_roots: Option<usize>,
    },
    Reset,
}

/// Runs crawl commands on a background tokio runtime and hands events back
/// over a channel.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<CrawlEvent>,
    session: SessionHandle,
    cancel: Mutex<CancellationToken>,
}

impl EngineHandle {
    /// Wire the HTTP sources for `context` and start the engine thread.
    pub fn new(
        settings: CrawlSettings,
        fetch: FetchSettings,
        context: ThreadContext,
    ) -> Result<Self, FetchError> {
        let api = ApiClient::new(fetch)?;
        let session = SessionHandle::new(CrawlSession::new(settings.breaker_threshold));
        let top_level = Arc::new(MainListingTrigger::new(
            api.clone(),
            context.clone(),
            session.clone(),
        ));
        let pages = Arc::new(ReqwestReplySource::new(api));
        Ok(Self::with_sources(settings, context, session, top_level, pages))
    }

    /// Start the engine thread over caller-provided sources.
    pub fn with_sources(
        settings: CrawlSettings,
        context: ThreadContext,
        session: SessionHandle,
        top_level: Arc<dyn TopLevelSource>,
        pages: Arc<dyn ReplyPageSource>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let sink = Arc::new(ChannelProgressSink::new(event_tx));
        let crawler = Arc::new(Crawler::new(
            settings,
            context,
            session.clone(),
            top_level,
            pages,
            sink,
        ));

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    harvest_error!("failed to start the engine runtime: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                let crawler = crawler.clone();
                runtime.spawn(async move {
                    handle_command(&crawler, command).await;
                });
            }
        });

        Self {
            cmd_tx,
            event_rx,
            session,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Collect top-level comments up to `target`, then their replies.
    pub fn run_batch(&self, target: usize) {
        let cancel = self.current_token();
        let _ = self.cmd_tx.send(EngineCommand::RunBatch { target, cancel });
    }

    pub fn acquire_top_level(&self, target: usize) {
        let cancel = self.current_token();
        let _ = self
            .cmd_tx
            .send(EngineCommand::AcquireTopLevel { target, cancel });
    }

    pub fn export(
        &self,
        format: ExportFormat,
        output_dir: impl Into<PathBuf>,
        metadata: SessionMetadata,
        max_roots: Option<usize>,
    ) {
        let _ = self.cmd_tx.send(EngineCommand::Export {
            format,
            output_dir: output_dir.into(),
            metadata,
            max_roots,
        });
    }

    /// Stop in-flight work and clear the session.
    pub fn reset(&self) {
        self.cancel();
        let _ = self.cmd_tx.send(EngineCommand::Reset);
    }

    /// Cancel every command sent so far. Later commands run normally.
    pub fn cancel(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn progress(&self) -> ProgressView {
        self.session.progress()
    }

    pub fn try_recv(&self) -> Option<CrawlEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block until the next event; `None` once the engine is gone.
    pub fn recv(&self) -> Option<CrawlEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<CrawlEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

async fn handle_command(crawler: &Crawler, command: EngineCommand) {
    match command {
        EngineCommand::RunBatch { target, cancel } => {
            if let Err(err) = crawler.run_batch(target, &cancel).await {
                crawler.sink.emit(CrawlEvent::Stopped(err));
            }
        }
        EngineCommand::AcquireTopLevel { target, cancel } => {
            if let Err(err) = crawler.acquire_top_level(target, &cancel).await {
                crawler.sink.emit(CrawlEvent::Stopped(err));
            }
        }
        EngineCommand::Export {
            format,
            output_dir,
            metadata,
            max_roots,
        } => {
            let result = export_session(crawler, format, output_dir, &metadata, max_roots);
            match &result {
                Ok(summary) => crawler.log(format!(
                    "Exported {} comments to {}",
                    summary.comment_count,
                    summary.output_path.display()
                )),
                Err(err) => crawler.log(format!("Export failed: {err}")),
            }
            crawler.sink.emit(CrawlEvent::ExportCompleted(result));
        }
        EngineCommand::Reset => crawler.reset(),
    }
}

fn export_session(
    crawler: &Crawler,
    format: ExportFormat,
    output_dir: PathBuf,
    metadata: &SessionMetadata,
    max_roots: Option<usize>,
) -> Result<ExportSummary, String> {
    let tree = crawler.session.export_tree(max_roots);
    exporter_for(format, &output_dir)
        .export(&tree, metadata)
        .map_err(|err| err.to_string())
}
