use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use tracelens_core::events::TabbedViewSwitched;
use tracelens_core::{
    AppEvent, EmitterSlot, EventEmitter, EventListener, EventSink, TraceType, View, ViewType,
};

#[derive(Debug, Default)]
struct TabsState {
    tabs: Vec<View>,
    active: Option<usize>,
}

/// The tabbed trace-view surface. Exactly one tab is focused while viewers
/// are loaded; every focus change is announced with `TabbedViewSwitched`.
#[derive(Debug, Default)]
pub struct TraceViewTabs {
    emitter: EmitterSlot,
    state: Mutex<TabsState>,
}

impl TraceViewTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tabs(&self) -> Vec<View> {
        self.state.lock().tabs.clone()
    }

    pub fn active_view(&self) -> Option<View> {
        let state = self.state.lock();
        state.active.and_then(|i| state.tabs.get(i).cloned())
    }

    /// Focus tab `index` (a user click). Returns false for an unknown tab.
    pub fn show_tab(&self, index: usize) -> bool {
        let view = {
            let mut state = self.state.lock();
            let Some(view) = state.tabs.get(index).cloned() else {
                return false;
            };
            state.active = Some(index);
            view
        };
        debug!(view = %view.id, "tab focused");
        self.emitter.emit(
            TabbedViewSwitched {
                new_focused_view: view,
            }
            .into(),
        )
    }

    fn load(&self, views: &[View]) {
        let mut state = self.state.lock();
        state.tabs = views
            .iter()
            .filter(|v| v.view_type == ViewType::Tab)
            .cloned()
            .collect();
        state.active = None;
    }

    fn show_tab_for(&self, trace_type: TraceType) {
        let index = self
            .state
            .lock()
            .tabs
            .iter()
            .position(|v| v.depends_on(trace_type));
        match index {
            Some(index) => {
                self.show_tab(index);
            }
            None => warn!(%trace_type, "no tab presents the requested trace type"),
        }
    }
}

#[async_trait]
impl EventListener for TraceViewTabs {
    async fn on_event(&self, event: &AppEvent) {
        match event {
            AppEvent::ViewersLoaded(loaded) => {
                self.load(&loaded.views);
                self.show_tab(0);
            }
            AppEvent::ViewersUnloaded(_) => {
                *self.state.lock() = TabsState::default();
            }
            AppEvent::TabbedViewSwitchRequest(request) => {
                self.show_tab_for(request.new_active_trace_type);
            }
            _ => {}
        }
    }
}

impl EventEmitter for TraceViewTabs {
    fn set_emit_event(&self, sink: EventSink) {
        self.emitter.set(sink);
    }
}
