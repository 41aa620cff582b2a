pub mod archive;
pub mod format;
pub mod local;
pub mod pipeline;

pub use local::{LocalTracePipeline, PipelineConfig};
pub use pipeline::{FilesSource, TracePipeline};
