use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tracelens_core::events::{ViewersLoaded, ViewersUnloaded};
use tracelens_core::{
    AppEvent, EventEmitter, EventListener, EventSink, LoadError, ProgressListener, Timestamp,
    TraceFile, TracePosition, UserNotificationListener,
};
use tracelens_pipeline::{FilesSource, TracePipeline};
use tracelens_timeline::TimelineData;
use tracelens_viewers::{Viewer, ViewerFactory};

use crate::scheduler::PresentationScheduler;

/// Anything that both listens to and emits app events.
pub trait Component: EventListener + EventEmitter {}

impl<T: EventListener + EventEmitter + ?Sized> Component for T {}

/// Everything the mediator is wired to at startup.
pub struct MediatorComponents {
    pub pipeline: Box<dyn TracePipeline>,
    pub viewer_factory: Arc<dyn ViewerFactory>,
    /// Companion-tool bridge; receives every position update it did not cause.
    pub cross_tool: Option<Arc<dyn Component>>,
    /// Attachment-download bridge; started by `AppInitialized`.
    pub abt_extension: Option<Arc<dyn Component>>,
    /// Host UI: receives viewers loaded/unloaded and tab switches.
    pub app: Arc<dyn EventListener>,
    pub notifications: Arc<dyn UserNotificationListener>,
    pub scheduler: Arc<dyn PresentationScheduler>,
}

/// Central coordinator.
///
/// Owns the pipeline and the timeline, holds every other component as a
/// trait object, and handles one event at a time to completion. Events
/// emitted by components while an event is being handled are queued in the
/// inbox and picked up by [`Mediator::process_pending`] or [`Mediator::run`].
pub struct Mediator {
    pipeline: Box<dyn TracePipeline>,
    timeline: TimelineData,
    viewer_factory: Arc<dyn ViewerFactory>,
    cross_tool: Option<Arc<dyn Component>>,
    abt_extension: Option<Arc<dyn Component>>,
    app: Arc<dyn EventListener>,
    notifications: Arc<dyn UserNotificationListener>,
    scheduler: Arc<dyn PresentationScheduler>,

    upload_traces: Option<Arc<dyn ProgressListener>>,
    collect_traces: Option<Arc<dyn ProgressListener>>,
    trace_view: Option<Arc<dyn Component>>,
    timeline_view: Option<Arc<dyn Component>>,

    viewers: Vec<Arc<dyn Viewer>>,
    viewers_loaded: bool,
    last_remote_timestamp: Option<Timestamp>,
    current_progress: Option<Arc<dyn ProgressListener>>,

    sink: EventSink,
    inbox: mpsc::UnboundedReceiver<AppEvent>,
}

impl Mediator {
    pub fn new(components: MediatorComponents) -> Self {
        let (sink, inbox) = EventSink::channel();
        for bridge in [&components.cross_tool, &components.abt_extension]
            .into_iter()
            .flatten()
        {
            bridge.set_emit_event(sink.clone());
        }
        Self {
            pipeline: components.pipeline,
            timeline: TimelineData::new(),
            viewer_factory: components.viewer_factory,
            cross_tool: components.cross_tool,
            abt_extension: components.abt_extension,
            app: components.app,
            notifications: components.notifications,
            scheduler: components.scheduler,
            upload_traces: None,
            collect_traces: None,
            trace_view: None,
            timeline_view: None,
            viewers: Vec::new(),
            viewers_loaded: false,
            last_remote_timestamp: None,
            current_progress: None,
            sink,
            inbox,
        }
    }

    pub fn set_upload_traces_component(&mut self, component: Option<Arc<dyn ProgressListener>>) {
        self.upload_traces = component;
    }

    pub fn set_collect_traces_component(&mut self, component: Option<Arc<dyn ProgressListener>>) {
        self.collect_traces = component;
    }

    pub fn set_trace_view_component(&mut self, component: Option<Arc<dyn Component>>) {
        if let Some(component) = &component {
            component.set_emit_event(self.sink.clone());
        }
        self.trace_view = component;
    }

    pub fn set_timeline_component(&mut self, component: Option<Arc<dyn Component>>) {
        if let Some(component) = &component {
            component.set_emit_event(self.sink.clone());
        }
        self.timeline_view = component;
    }

    /// Handle for hosts to feed events into the inbox.
    pub fn event_sink(&self) -> EventSink {
        self.sink.clone()
    }

    pub fn viewers(&self) -> &[Arc<dyn Viewer>] {
        &self.viewers
    }

    pub fn are_viewers_loaded(&self) -> bool {
        self.viewers_loaded
    }

    pub fn timeline(&self) -> &TimelineData {
        &self.timeline
    }

    pub fn last_remote_timestamp(&self) -> Option<Timestamp> {
        self.last_remote_timestamp
    }

    /// Handle one event, including all the work it triggers.
    pub async fn on_event(&mut self, event: &AppEvent) {
        debug!(kind = event.kind().as_str(), "handling event");
        match event {
            AppEvent::AppInitialized(_) => {
                if let Some(extension) = &self.abt_extension {
                    extension.on_event(event).await;
                }
            }
            AppEvent::AppFilesUploaded(uploaded) => {
                self.current_progress = self.upload_traces.clone();
                self.load_files(uploaded.files.clone(), FilesSource::Uploaded)
                    .await;
            }
            AppEvent::AppFilesCollected(collected) => {
                self.current_progress = self.collect_traces.clone();
                self.load_files(collected.files.clone(), FilesSource::Collected)
                    .await;
                self.process_loaded_trace_files().await;
            }
            AppEvent::AppResetRequest(_) => {
                self.reset_app_to_initial_state().await;
            }
            AppEvent::AppTraceViewRequest(_) => {
                self.process_loaded_trace_files().await;
            }
            AppEvent::BuganizerAttachmentsDownloadStart(_) => {
                self.reset_app_to_initial_state().await;
                self.current_progress = self.upload_traces.clone();
                self.report_progress("Downloading files...", None);
            }
            AppEvent::BuganizerAttachmentsDownloaded(downloaded) => {
                self.current_progress = self.upload_traces.clone();
                self.process_remote_files_received(
                    downloaded.files.clone(),
                    FilesSource::Buganizer,
                )
                .await;
            }
            AppEvent::TabbedViewSwitchRequest(_) => {
                if let Some(trace_view) = &self.trace_view {
                    trace_view.on_event(event).await;
                }
            }
            AppEvent::TabbedViewSwitched(switched) => {
                self.app.on_event(event).await;
                self.timeline
                    .set_active_view_trace_types(switched.new_focused_view.dependencies.clone());
                self.propagate_trace_position(self.timeline.current_position(), false)
                    .await;
            }
            AppEvent::TracePositionUpdate(update) => {
                if self.timeline.set_position(Some(update.position.clone())) {
                    self.propagate_trace_position(self.timeline.current_position(), false)
                        .await;
                }
            }
            AppEvent::RemoteToolBugreportReceived(received) => {
                self.current_progress = self.upload_traces.clone();
                self.process_remote_files_received(
                    vec![received.bugreport.clone()],
                    FilesSource::Bugreport,
                )
                .await;
                if let Some(timestamp) = received.timestamp {
                    self.on_remote_tool_timestamp_received(timestamp).await;
                }
            }
            AppEvent::RemoteToolTimestampReceived(received) => {
                self.on_remote_tool_timestamp_received(received.timestamp)
                    .await;
            }
            AppEvent::ViewersLoaded(_) | AppEvent::ViewersUnloaded(_) => {
                debug!(kind = event.kind().as_str(), "host-only event, ignoring");
            }
        }
    }

    /// Handle every queued event, oldest first, including events queued
    /// while draining. Returns how many were handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox.try_recv() {
            self.on_event(&event).await;
            handled += 1;
        }
        handled
    }

    /// Handle queued events as they arrive until `shutdown` fires.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!("mediator running");
        loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => break,
                event = self.inbox.recv() => event,
            };
            let Some(event) = event else {
                break;
            };
            self.on_event(&event).await;
        }
        info!("mediator stopped");
    }

    /// Notify every receiver of `position` concurrently and wait for all of
    /// them.
    async fn propagate_trace_position(
        &self,
        position: Option<TracePosition>,
        omit_cross_tool_protocol: bool,
    ) {
        let Some(position) = position else {
            return;
        };
        let event = AppEvent::trace_position_update(position);

        let mut receivers: Vec<BoxFuture<'_, ()>> =
            self.viewers.iter().map(|v| v.on_event(&event)).collect();
        if !omit_cross_tool_protocol {
            if let Some(cross_tool) = &self.cross_tool {
                receivers.push(cross_tool.on_event(&event));
            }
        }
        if let Some(timeline_view) = &self.timeline_view {
            receivers.push(timeline_view.on_event(&event));
        }
        debug!(receivers = receivers.len(), "propagating trace position");
        join_all(receivers).await;
    }

    async fn on_remote_tool_timestamp_received(&mut self, timestamp: Timestamp) {
        self.last_remote_timestamp = Some(timestamp);

        if !self.viewers_loaded {
            debug!(%timestamp, "viewers not loaded, applying remote timestamp later");
            return;
        }

        if self.timeline.timestamp_type() != Some(timestamp.timestamp_type()) {
            warn!(
                remote = %timestamp.timestamp_type(),
                timeline = ?self.timeline.timestamp_type(),
                "cannot apply remote timestamp of a different type"
            );
            return;
        }

        let position = self.timeline.make_position_from_active_trace(timestamp);
        self.timeline.set_position(Some(position));
        self.propagate_trace_position(self.timeline.current_position(), true)
            .await;
    }

    async fn process_remote_files_received(&mut self, files: Vec<TraceFile>, source: FilesSource) {
        self.reset_app_to_initial_state().await;
        self.load_files(files, source).await;
    }

    async fn load_files(&mut self, files: Vec<TraceFile>, source: FilesSource) {
        let errors = self
            .pipeline
            .load_files(files, self.current_progress.clone(), source)
            .await;
        self.notify_errors(&errors);
    }

    async fn process_loaded_trace_files(&mut self) {
        self.report_progress("Computing frame mapping...", None);
        self.scheduler.yield_to_presentation().await;

        let errors = self.pipeline.build_traces().await;
        self.notify_errors(&errors);
        if let Some(progress) = &self.current_progress {
            progress.on_operation_finished();
        }

        self.report_progress("Initializing UI...", None);
        self.scheduler.yield_to_presentation().await;

        if let Err(err) = self.timeline.initialize(
            self.pipeline.traces(),
            self.pipeline.screen_recording_video(),
        ) {
            warn!(error = %err, "cannot initialize timeline");
            self.notify_errors(&[LoadError::NoCommonTimestampType]);
            self.unload_viewers().await;
            return;
        }

        self.viewers = self.viewer_factory.create_viewers(self.timeline.traces());
        for viewer in &self.viewers {
            viewer.set_emit_event(self.sink.clone());
        }

        let views = self.viewers.iter().flat_map(|v| v.views()).collect();
        let loaded: AppEvent = ViewersLoaded { views }.into();
        self.app.on_event(&loaded).await;
        if let Some(trace_view) = &self.trace_view {
            trace_view.on_event(&loaded).await;
        }

        let initial_position = self.initial_trace_position();
        self.timeline.set_position(initial_position.clone());
        self.propagate_trace_position(initial_position, true).await;

        self.viewers_loaded = true;
        info!(viewers = self.viewers.len(), "viewers loaded");
    }

    fn initial_trace_position(&self) -> Option<TracePosition> {
        if let Some(timestamp) = self.last_remote_timestamp {
            if self.timeline.timestamp_type() == Some(timestamp.timestamp_type()) {
                return Some(self.timeline.make_position_from_active_trace(timestamp));
            }
        }

        if let Some(position) = self.timeline.current_position() {
            return Some(position);
        }

        // only dumps with invalid timestamps: anchor to any entry
        self.timeline
            .traces()
            .iter()
            .find_map(|trace| trace.entry(0))
            .map(|entry| TracePosition::from_trace_entry(entry, None))
    }

    async fn reset_app_to_initial_state(&mut self) {
        self.pipeline.clear();
        self.timeline.clear();
        self.last_remote_timestamp = None;
        self.viewers.clear();
        self.viewers_loaded = false;
        self.notify_viewers_unloaded().await;
    }

    async fn unload_viewers(&mut self) {
        let had_viewers = self.viewers_loaded || !self.viewers.is_empty();
        self.viewers.clear();
        self.viewers_loaded = false;
        if had_viewers {
            self.notify_viewers_unloaded().await;
        }
    }

    async fn notify_viewers_unloaded(&self) {
        let unloaded: AppEvent = ViewersUnloaded.into();
        self.app.on_event(&unloaded).await;
        if let Some(trace_view) = &self.trace_view {
            trace_view.on_event(&unloaded).await;
        }
    }

    fn report_progress(&self, message: &str, percentage: Option<f64>) {
        if let Some(progress) = &self.current_progress {
            progress.on_progress_update(message, percentage);
        }
    }

    fn notify_errors(&self, errors: &[LoadError]) {
        if errors.is_empty() {
            return;
        }
        for error in errors {
            warn!(error = %error, kind = error.error_type(), "load error");
        }
        self.notifications.on_errors(errors);
    }
}
