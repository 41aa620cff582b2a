//! Recording test doubles for every collaborator of the [`Mediator`](crate::Mediator).
//!
//! Doubles can share a [`CallLog`] so tests can assert the interleaving of
//! calls across components.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use tracelens_core::{
    AppEvent, EmitterSlot, EventEmitter, EventKind, EventListener, EventSink, LoadError,
    ProgressListener, ScreenRecording, TraceFile, TracePosition, Traces, UserNotificationListener,
};
use tracelens_pipeline::{FilesSource, TracePipeline};
use tracelens_viewers::{TraceEntryViewer, Viewer, ViewerFactory};

use crate::scheduler::PresentationScheduler;

/// Ordered log of calls shared between doubles.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Listener/emitter that records every event it receives.
pub struct RecordingListener {
    name: String,
    delay: Option<Duration>,
    log: Option<CallLog>,
    events: Mutex<Vec<AppEvent>>,
    emitter: EmitterSlot,
}

impl RecordingListener {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delay: None,
            log: None,
            events: Mutex::new(Vec::new()),
            emitter: EmitterSlot::new(),
        }
    }

    /// Sleep this long before recording each event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(AppEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.is(kind)).count()
    }

    /// Positions of the `TracePositionUpdate`s received, in order.
    pub fn positions(&self) -> Vec<TracePosition> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                AppEvent::TracePositionUpdate(update) => Some(update.position.clone()),
                _ => None,
            })
            .collect()
    }

    /// Emit through the registered sink, as the real component would.
    pub fn emit(&self, event: AppEvent) -> bool {
        self.emitter.emit(event)
    }

    pub fn is_wired(&self) -> bool {
        self.emitter.is_wired()
    }
}

#[async_trait]
impl EventListener for RecordingListener {
    async fn on_event(&self, event: &AppEvent) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(log) = &self.log {
            log.push(format!("{}:{}", self.name, event.kind().as_str()));
        }
        self.events.lock().push(event.clone());
    }
}

impl EventEmitter for RecordingListener {
    fn set_emit_event(&self, sink: EventSink) {
        self.emitter.set(sink);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressRecord {
    Update(String, Option<f64>),
    Finished,
}

#[derive(Default)]
pub struct RecordingProgress {
    log: Option<CallLog>,
    records: Mutex<Vec<ProgressRecord>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log: Some(log),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<ProgressRecord> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                ProgressRecord::Update(message, _) => Some(message.clone()),
                ProgressRecord::Finished => None,
            })
            .collect()
    }
}

impl ProgressListener for RecordingProgress {
    fn on_progress_update(&self, message: &str, progress_percentage: Option<f64>) {
        if let Some(log) = &self.log {
            log.push(format!("progress:{message}"));
        }
        self.records
            .lock()
            .push(ProgressRecord::Update(message.to_string(), progress_percentage));
    }

    fn on_operation_finished(&self) {
        if let Some(log) = &self.log {
            log.push("progress:finished");
        }
        self.records.lock().push(ProgressRecord::Finished);
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    errors: Mutex<Vec<LoadError>>,
}

impl RecordingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<LoadError> {
        self.errors.lock().clone()
    }
}

impl UserNotificationListener for RecordingNotifications {
    fn on_errors(&self, errors: &[LoadError]) {
        self.errors.lock().extend_from_slice(errors);
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    log: Option<CallLog>,
    yields: Mutex<usize>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log: Some(log),
            yields: Mutex::new(0),
        }
    }

    pub fn yields(&self) -> usize {
        *self.yields.lock()
    }
}

#[async_trait]
impl PresentationScheduler for RecordingScheduler {
    async fn yield_to_presentation(&self) {
        if let Some(log) = &self.log {
            log.push("yield");
        }
        *self.yields.lock() += 1;
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Default)]
struct MockPipelineState {
    traces: Traces,
    screen_recording: Option<ScreenRecording>,
    load_errors: Vec<LoadError>,
    build_errors: Vec<LoadError>,
    built: Option<Traces>,
    loaded: Vec<(Vec<String>, FilesSource)>,
}

/// Pipeline that "builds" a preconfigured collection. Clones share state,
/// so a test can keep a handle after boxing one into the mediator.
#[derive(Clone, Debug, Default)]
pub struct MockPipeline {
    state: Arc<Mutex<MockPipelineState>>,
    log: CallLog,
}

impl MockPipeline {
    pub fn new(traces: Traces) -> Self {
        let pipeline = Self::default();
        pipeline.state.lock().traces = traces;
        pipeline
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn set_traces(&self, traces: Traces) {
        self.state.lock().traces = traces;
    }

    pub fn set_screen_recording(&self, recording: ScreenRecording) {
        self.state.lock().screen_recording = Some(recording);
    }

    pub fn set_load_errors(&self, errors: Vec<LoadError>) {
        self.state.lock().load_errors = errors;
    }

    pub fn set_build_errors(&self, errors: Vec<LoadError>) {
        self.state.lock().build_errors = errors;
    }

    /// File names and source of every `load_files` call.
    pub fn loaded(&self) -> Vec<(Vec<String>, FilesSource)> {
        self.state.lock().loaded.clone()
    }
}

#[async_trait]
impl TracePipeline for MockPipeline {
    async fn load_files(
        &mut self,
        files: Vec<TraceFile>,
        progress: Option<Arc<dyn ProgressListener>>,
        source: FilesSource,
    ) -> Vec<LoadError> {
        self.log.push(format!("pipeline:load_files:{source}"));
        if let Some(progress) = progress {
            progress.on_progress_update("Loading files", Some(100.0));
            progress.on_operation_finished();
        }
        let mut state = self.state.lock();
        state
            .loaded
            .push((files.into_iter().map(|f| f.name).collect(), source));
        state.load_errors.clone()
    }

    async fn build_traces(&mut self) -> Vec<LoadError> {
        self.log.push("pipeline:build_traces");
        let mut state = self.state.lock();
        state.built = Some(state.traces.clone());
        state.build_errors.clone()
    }

    fn traces(&self) -> Traces {
        self.state.lock().built.clone().unwrap_or_default()
    }

    fn screen_recording_video(&self) -> Option<ScreenRecording> {
        let state = self.state.lock();
        state.built.as_ref().and(state.screen_recording.clone())
    }

    fn clear(&mut self) {
        self.log.push("pipeline:clear");
        self.state.lock().built = None;
    }
}

/// Builds one [`TraceEntryViewer`] per trace, like the default factory, and
/// keeps a concrete handle on each so tests can inspect them.
#[derive(Default)]
pub struct RecordingViewerFactory {
    created: Mutex<Vec<Arc<TraceEntryViewer>>>,
}

impl RecordingViewerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every viewer built so far, in creation order.
    pub fn created(&self) -> Vec<Arc<TraceEntryViewer>> {
        self.created.lock().clone()
    }
}

impl ViewerFactory for RecordingViewerFactory {
    fn create_viewers(&self, traces: &Traces) -> Vec<Arc<dyn Viewer>> {
        let viewers: Vec<Arc<TraceEntryViewer>> = traces
            .iter()
            .map(|trace| Arc::new(TraceEntryViewer::new(Arc::clone(trace))))
            .collect();
        self.created.lock().extend(viewers.iter().cloned());
        viewers
            .into_iter()
            .map(|viewer| viewer as Arc<dyn Viewer>)
            .collect()
    }
}
