use serde::{Deserialize, Serialize};

use crate::trace::TraceType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    /// Shown as one tab of the trace view; one tab is focused at a time.
    Tab,
    /// Floats above the tabs (e.g. the screen recording).
    Overlay,
}

/// A presentable surface of a viewer and the trace types it depends on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub title: String,
    pub view_type: ViewType,
    pub dependencies: Vec<TraceType>,
}

impl View {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        view_type: ViewType,
        dependencies: Vec<TraceType>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            view_type,
            dependencies,
        }
    }

    pub fn depends_on(&self, trace_type: TraceType) -> bool {
        self.dependencies.contains(&trace_type)
    }
}
