mod timeline_data;

pub use timeline_data::{TimelineData, TimelineError};
