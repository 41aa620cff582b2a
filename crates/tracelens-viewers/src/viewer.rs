use tracelens_core::{EventEmitter, EventListener, TraceEntry, TraceType, View};

/// A component presenting one or more traces.
pub trait Viewer: EventListener + EventEmitter {
    fn views(&self) -> Vec<View>;

    /// Trace types this viewer needs to be built.
    fn dependencies(&self) -> Vec<TraceType>;

    /// Entries currently selected, at most one per dependency.
    fn current_entries(&self) -> Vec<TraceEntry>;
}
