pub mod errors;
pub mod events;
pub mod files;
pub mod position;
pub mod protocol;
pub mod time;
pub mod trace;
pub mod view;

pub use errors::LoadError;
pub use events::{AppEvent, EventKind, EventPayload};
pub use files::{ScreenRecording, TraceFile};
pub use position::TracePosition;
pub use protocol::{
    EmitterSlot, EventEmitter, EventListener, EventSink, ProgressListener, UserNotificationListener,
};
pub use time::{TimeRange, Timestamp, TimestampType};
pub use trace::{Trace, TraceEntry, TraceType, Traces, TracesBuilder};
pub use view::{View, ViewType};
