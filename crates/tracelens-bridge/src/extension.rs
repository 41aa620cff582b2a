use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use tracelens_core::events::{
    AppInitialized, BuganizerAttachmentsDownloadStart, BuganizerAttachmentsDownloaded,
};
use tracelens_core::{AppEvent, EmitterSlot, EventEmitter, EventListener, EventSink, TraceFile};

use crate::errors::BridgeError;

/// Where issue attachments come from.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TraceFile>, BridgeError>;
}

/// Reads every regular file of a directory, sorted by name.
#[derive(Clone, Debug)]
pub struct DirectoryAttachmentSource {
    dir: PathBuf,
}

impl DirectoryAttachmentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AttachmentSource for DirectoryAttachmentSource {
    async fn fetch(&self) -> Result<Vec<TraceFile>, BridgeError> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(TraceFile::from_path(&path).await?);
        }
        Ok(files)
    }
}

/// Downloads attachments once the app is up. Without a source the bridge
/// stays silent.
pub struct AbtExtensionProtocol {
    emitter: EmitterSlot,
    source: Option<Arc<dyn AttachmentSource>>,
}

impl AbtExtensionProtocol {
    pub fn new(source: Option<Arc<dyn AttachmentSource>>) -> Self {
        Self {
            emitter: EmitterSlot::new(),
            source,
        }
    }

    async fn on_app_initialized(&self) {
        let Some(source) = &self.source else {
            return;
        };
        self.emitter.emit(BuganizerAttachmentsDownloadStart.into());
        match source.fetch().await {
            Ok(files) => {
                info!(files = files.len(), "attachments downloaded");
                self.emitter
                    .emit(BuganizerAttachmentsDownloaded { files }.into());
            }
            Err(err) => warn!(error = %err, kind = err.error_kind(), "attachment download failed"),
        }
    }
}

#[async_trait]
impl EventListener for AbtExtensionProtocol {
    async fn on_event(&self, event: &AppEvent) {
        event
            .visit::<AppInitialized, _, _>(move |_| async move {
                self.on_app_initialized().await;
            })
            .await;
    }
}

impl EventEmitter for AbtExtensionProtocol {
    fn set_emit_event(&self, sink: EventSink) {
        self.emitter.set(sink);
    }
}
