use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use tracelens_core::{LoadError, ProgressListener, ScreenRecording, TraceFile, Traces};

/// Where a batch of files came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilesSource {
    Uploaded,
    Collected,
    Remote,
    Bugreport,
    Buganizer,
}

impl FilesSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Collected => "collected",
            Self::Remote => "remote",
            Self::Bugreport => "bugreport",
            Self::Buganizer => "buganizer",
        }
    }
}

impl fmt::Display for FilesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingests raw files and normalizes them into a [`Traces`] collection.
///
/// Load conditions are returned, never raised: the caller decides how to
/// surface them.
#[async_trait]
pub trait TracePipeline: Send + Sync {
    /// Ingest `files`. May be called several times before a build; batches
    /// accumulate.
    async fn load_files(
        &mut self,
        files: Vec<TraceFile>,
        progress: Option<Arc<dyn ProgressListener>>,
        source: FilesSource,
    ) -> Vec<LoadError>;

    /// Normalize everything ingested so far. Only the first call per load
    /// cycle does any work.
    async fn build_traces(&mut self) -> Vec<LoadError>;

    fn traces(&self) -> Traces;

    fn screen_recording_video(&self) -> Option<ScreenRecording>;

    fn clear(&mut self);
}
