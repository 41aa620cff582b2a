//! Viewer set and the tabbed trace-view surface.
//!
//! Viewers hear about the current position through
//! [`AppEvent::TracePositionUpdate`](tracelens_core::AppEvent) and report
//! user interaction back as new events through their emitter.

mod entry_viewer;
mod factory;
mod tabs;
mod viewer;

pub use entry_viewer::TraceEntryViewer;
pub use factory::{DefaultViewerFactory, ViewerFactory};
pub use tabs::TraceViewTabs;
pub use viewer::Viewer;
