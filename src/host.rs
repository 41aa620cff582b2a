//! Console stand-in for the host UI: logs what a window would show and
//! renders the final state as JSON.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use tracelens_core::{AppEvent, EventListener, LoadError, ProgressListener, UserNotificationListener};
use tracelens_mediator::Mediator;
use tracelens_viewers::TraceViewTabs;

/// App surface, progress bars and notification area in one.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    errors: Mutex<Vec<LoadError>>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<LoadError> {
        self.errors.lock().clone()
    }
}

#[async_trait]
impl EventListener for ConsoleHost {
    async fn on_event(&self, event: &AppEvent) {
        match event {
            AppEvent::ViewersLoaded(loaded) => {
                let views: Vec<&str> = loaded.views.iter().map(|v| v.title.as_str()).collect();
                info!(?views, "viewers loaded");
            }
            AppEvent::ViewersUnloaded(_) => info!("viewers unloaded"),
            AppEvent::TabbedViewSwitched(switched) => {
                info!(view = %switched.new_focused_view.id, "tab switched");
            }
            _ => {}
        }
    }
}

impl ProgressListener for ConsoleHost {
    fn on_progress_update(&self, message: &str, progress_percentage: Option<f64>) {
        info!(message, progress = ?progress_percentage, "progress");
    }

    fn on_operation_finished(&self) {
        info!("operation finished");
    }
}

impl UserNotificationListener for ConsoleHost {
    fn on_errors(&self, errors: &[LoadError]) {
        for error in errors {
            warn!(kind = error.error_type(), "{error}");
        }
        self.errors.lock().extend_from_slice(errors);
    }
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub timestamp_type: Option<String>,
    pub position: Option<PositionSummary>,
    pub focused_view: Option<String>,
    pub viewers: Vec<ViewerSummary>,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PositionSummary {
    pub timestamp_ns: i64,
    pub trace_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViewerSummary {
    pub views: Vec<String>,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Serialize)]
pub struct EntrySummary {
    pub trace_type: String,
    pub index: usize,
    pub timestamp_ns: i64,
    pub data: Value,
}

pub fn summarize(mediator: &Mediator, tabs: &TraceViewTabs, host: &ConsoleHost) -> Summary {
    let timeline = mediator.timeline();
    Summary {
        timestamp_type: timeline.timestamp_type().map(|t| t.to_string()),
        position: timeline.current_position().map(|p| PositionSummary {
            timestamp_ns: p.timestamp().value_ns(),
            trace_type: p.trace_type().map(|t| t.to_string()),
        }),
        focused_view: tabs.active_view().map(|v| v.id),
        viewers: mediator
            .viewers()
            .iter()
            .map(|viewer| ViewerSummary {
                views: viewer.views().into_iter().map(|v| v.id).collect(),
                entries: viewer
                    .current_entries()
                    .into_iter()
                    .map(|entry| EntrySummary {
                        trace_type: entry.trace_type().to_string(),
                        index: entry.index(),
                        timestamp_ns: entry.timestamp().value_ns(),
                        data: entry.payload().clone(),
                    })
                    .collect(),
            })
            .collect(),
        errors: host.errors().iter().map(ToString::to_string).collect(),
    }
}
