//! Wires the mediator to the local pipeline, the bridges and the console
//! host, and replays command-line requests as app events.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tracelens_bridge::{
    AbtExtensionProtocol, AttachmentSource, CrossToolProtocol, DirectoryAttachmentSource,
};
use tracelens_core::events::{
    AppFilesCollected, AppFilesUploaded, AppInitialized, AppTraceViewRequest,
    RemoteToolTimestampReceived, TabbedViewSwitchRequest,
};
use tracelens_core::{
    AppEvent, EventSink, ProgressListener, Timestamp, TimestampType, TraceFile, TracePosition,
    TraceType,
};
use tracelens_mediator::{scheduler_for_delay, Component, Mediator, MediatorComponents};
use tracelens_pipeline::{LocalTracePipeline, PipelineConfig};
use tracelens_settings::TracelensSettings;
use tracelens_viewers::{DefaultViewerFactory, TraceViewTabs};

use crate::host::{summarize, ConsoleHost, Summary};

/// What to do once the app is up.
#[derive(Clone, Debug, Default)]
pub struct Requests {
    pub files: Vec<PathBuf>,
    pub upload: bool,
    pub remote_timestamp: Option<i64>,
    pub focus: Option<TraceType>,
    pub position: Option<i64>,
}

pub struct Session {
    mediator: Mediator,
    sink: EventSink,
    tabs: Arc<TraceViewTabs>,
    host: Arc<ConsoleHost>,
    cross_tool: Option<Arc<CrossToolProtocol>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl Session {
    pub fn new(settings: &TracelensSettings) -> Self {
        let host = Arc::new(ConsoleHost::new());
        let tabs = Arc::new(TraceViewTabs::new());

        let (outbound_tx, outbound) = mpsc::unbounded_channel();
        let cross_tool = settings
            .bridges
            .cross_tool_enabled
            .then(|| Arc::new(CrossToolProtocol::new(outbound_tx)));

        let attachments = settings.bridges.attachments_dir.as_ref().map(|dir| {
            Arc::new(DirectoryAttachmentSource::new(dir)) as Arc<dyn AttachmentSource>
        });
        let extension: Arc<dyn Component> = Arc::new(AbtExtensionProtocol::new(attachments));

        let pipeline = LocalTracePipeline::new(PipelineConfig {
            old_data_threshold: settings.pipeline.old_data_threshold(),
        });
        let mut mediator = Mediator::new(MediatorComponents {
            pipeline: Box::new(pipeline),
            viewer_factory: Arc::new(DefaultViewerFactory),
            cross_tool: cross_tool.clone().map(|c| c as Arc<dyn Component>),
            abt_extension: Some(extension),
            app: host.clone(),
            notifications: host.clone(),
            scheduler: scheduler_for_delay(Duration::from_millis(
                settings.presentation.yield_delay_ms,
            )),
        });
        mediator.set_upload_traces_component(Some(host.clone() as Arc<dyn ProgressListener>));
        mediator.set_collect_traces_component(Some(host.clone() as Arc<dyn ProgressListener>));
        mediator.set_trace_view_component(Some(tabs.clone() as Arc<dyn Component>));
        let sink = mediator.event_sink();

        Self {
            mediator,
            sink,
            tabs,
            host,
            cross_tool,
            outbound,
        }
    }

    fn emit(&self, event: AppEvent) {
        if !self.sink.emit(event) {
            warn!("mediator inbox closed");
        }
    }

    /// Start the app and replay `requests`, handling every resulting event.
    pub async fn open(&mut self, requests: &Requests) -> Result<()> {
        self.emit(AppInitialized.into());
        self.mediator.process_pending().await;

        if let Some(value_ns) = requests.remote_timestamp {
            self.emit(
                RemoteToolTimestampReceived {
                    timestamp: Timestamp::real(value_ns),
                }
                .into(),
            );
        }

        if !requests.files.is_empty() {
            let files = read_files(&requests.files).await?;
            if requests.upload {
                self.emit(AppFilesUploaded { files }.into());
                self.emit(AppTraceViewRequest.into());
            } else {
                self.emit(AppFilesCollected { files }.into());
            }
        }
        self.mediator.process_pending().await;

        if let Some(trace_type) = requests.focus {
            self.emit(
                TabbedViewSwitchRequest {
                    new_active_trace_type: trace_type,
                }
                .into(),
            );
        }
        self.mediator.process_pending().await;

        if let Some(value_ns) = requests.position {
            let timestamp_type = self
                .mediator
                .timeline()
                .timestamp_type()
                .unwrap_or(TimestampType::Real);
            let position = TracePosition::from_timestamp(Timestamp::new(timestamp_type, value_ns));
            self.emit(AppEvent::trace_position_update(position));
            self.mediator.process_pending().await;
        }
        Ok(())
    }

    /// Exchange cross-tool messages over stdin/stdout until stdin closes or
    /// `shutdown` fires.
    pub async fn listen(&mut self, shutdown: CancellationToken) -> Result<()> {
        let Some(cross_tool) = self.cross_tool.clone() else {
            warn!("cross-tool bridge disabled in settings, not listening");
            return Ok(());
        };

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let pump = cross_tool.start(inbound_rx, shutdown.clone());

        let reader_shutdown = shutdown.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                tokio::select! {
                    () = reader_shutdown.cancelled() => break,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            if inbound_tx.send(line).is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            warn!(error = %err, "failed to read stdin");
                            break;
                        }
                    },
                }
            }
            reader_shutdown.cancel();
        });

        info!("listening for cross-tool messages on stdin");
        let mediator = &mut self.mediator;
        let outbound = &mut self.outbound;
        let mut stdout = tokio::io::stdout();
        tokio::select! {
            () = mediator.run(shutdown.clone()) => {}
            () = forward_lines(outbound, &mut stdout) => {}
        }
        shutdown.cancel();

        reader.await.context("stdin reader panicked")?;
        pump.await.context("cross-tool pump panicked")?;
        flush_pending(outbound, &mut stdout).await;
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.mediator, &self.tabs, &self.host)
    }
}

async fn write_line(out: &mut (impl AsyncWrite + Unpin), line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}

async fn forward_lines(
    outbound: &mut mpsc::UnboundedReceiver<String>,
    out: &mut (impl AsyncWrite + Unpin),
) {
    while let Some(line) = outbound.recv().await {
        if let Err(err) = write_line(out, &line).await {
            warn!(error = %err, "failed to write cross-tool message");
            return;
        }
    }
}

/// Write whatever is still queued once forwarding has stopped.
async fn flush_pending(
    outbound: &mut mpsc::UnboundedReceiver<String>,
    out: &mut (impl AsyncWrite + Unpin),
) -> usize {
    let mut written = 0;
    while let Ok(line) = outbound.try_recv() {
        if let Err(err) = write_line(out, &line).await {
            warn!(error = %err, "failed to write cross-tool message");
            break;
        }
        written += 1;
    }
    written
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<TraceFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = TraceFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}
