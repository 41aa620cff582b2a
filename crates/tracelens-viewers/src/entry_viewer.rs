use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use tracelens_core::events::{TabbedViewSwitchRequest, TracePositionUpdate};
use tracelens_core::{
    AppEvent, EmitterSlot, EventEmitter, EventListener, EventSink, Trace, TraceEntry,
    TracePosition, TraceType, View, ViewType,
};

use crate::viewer::Viewer;

#[derive(Debug, Default)]
struct ViewerState {
    position: Option<TracePosition>,
    current_entry: Option<TraceEntry>,
    position_updates: usize,
}

/// Viewer bound to a single trace, tracking the entry selected by the
/// current position.
pub struct TraceEntryViewer {
    trace: Arc<Trace>,
    view: View,
    emitter: EmitterSlot,
    state: Mutex<ViewerState>,
}

impl TraceEntryViewer {
    pub fn new(trace: Arc<Trace>) -> Self {
        let trace_type = trace.trace_type();
        let view_type = match trace_type {
            TraceType::ScreenRecording => ViewType::Overlay,
            _ => ViewType::Tab,
        };
        let view = View::new(
            trace_type.as_str(),
            trace_type.display_name(),
            view_type,
            vec![trace_type],
        );
        Self {
            trace,
            view,
            emitter: EmitterSlot::new(),
            state: Mutex::new(ViewerState::default()),
        }
    }

    pub fn trace_type(&self) -> TraceType {
        self.trace.trace_type()
    }

    pub fn current_entry(&self) -> Option<TraceEntry> {
        self.state.lock().current_entry.clone()
    }

    pub fn position(&self) -> Option<TracePosition> {
        self.state.lock().position.clone()
    }

    /// Number of position updates received so far.
    pub fn position_updates(&self) -> usize {
        self.state.lock().position_updates
    }

    /// User picked entry `index`: ask for the timeline to move there.
    pub fn select_entry(&self, index: usize) -> bool {
        let Some(entry) = self.trace.entry(index) else {
            warn!(trace_type = %self.trace_type(), index, "no such entry");
            return false;
        };
        let position = TracePosition::from_trace_entry(entry, None);
        self.emitter.emit(AppEvent::trace_position_update(position))
    }

    /// Ask the trace view to bring the tab presenting `trace_type` forward.
    pub fn request_tab_switch(&self, trace_type: TraceType) -> bool {
        self.emitter.emit(
            TabbedViewSwitchRequest {
                new_active_trace_type: trace_type,
            }
            .into(),
        )
    }

    fn apply_position(&self, position: &TracePosition) {
        let entry = position.select_entry_in(&self.trace);
        debug!(
            trace_type = %self.trace_type(),
            index = ?entry.as_ref().map(TraceEntry::index),
            "position applied"
        );
        let mut state = self.state.lock();
        state.position = Some(position.clone());
        state.current_entry = entry;
        state.position_updates += 1;
    }
}

#[async_trait]
impl EventListener for TraceEntryViewer {
    async fn on_event(&self, event: &AppEvent) {
        event
            .visit::<TracePositionUpdate, _, _>(move |update| async move {
                self.apply_position(&update.position);
            })
            .await;
    }
}

impl EventEmitter for TraceEntryViewer {
    fn set_emit_event(&self, sink: EventSink) {
        self.emitter.set(sink);
    }
}

impl Viewer for TraceEntryViewer {
    fn views(&self) -> Vec<View> {
        vec![self.view.clone()]
    }

    fn dependencies(&self) -> Vec<TraceType> {
        vec![self.trace_type()]
    }

    fn current_entries(&self) -> Vec<TraceEntry> {
        self.current_entry().into_iter().collect()
    }
}
