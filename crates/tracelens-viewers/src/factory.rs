use std::sync::Arc;

use tracelens_core::Traces;

use crate::entry_viewer::TraceEntryViewer;
use crate::viewer::Viewer;

pub trait ViewerFactory: Send + Sync {
    /// Build the viewers for a freshly built collection.
    fn create_viewers(&self, traces: &Traces) -> Vec<Arc<dyn Viewer>>;
}

/// One [`TraceEntryViewer`] per trace, in declared trace-type order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultViewerFactory;

impl ViewerFactory for DefaultViewerFactory {
    fn create_viewers(&self, traces: &Traces) -> Vec<Arc<dyn Viewer>> {
        traces
            .iter()
            .map(|trace| Arc::new(TraceEntryViewer::new(Arc::clone(trace))) as Arc<dyn Viewer>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelens_core::{Timestamp, TraceType, TracesBuilder};

    #[test]
    fn one_viewer_per_trace_type() {
        let traces = TracesBuilder::new()
            .set_timestamps(TraceType::EventLog, vec![Timestamp::real(3)])
            .set_timestamps(TraceType::WindowManager, vec![Timestamp::real(1)])
            .set_timestamps(TraceType::Transitions, vec![])
            .build();
        let viewers = DefaultViewerFactory.create_viewers(&traces);

        let covered: Vec<TraceType> = viewers.iter().flat_map(|v| v.dependencies()).collect();
        assert_eq!(covered, traces.trace_types());
    }

    #[test]
    fn empty_collection_has_no_viewers() {
        assert!(DefaultViewerFactory.create_viewers(&Traces::new()).is_empty());
    }
}
