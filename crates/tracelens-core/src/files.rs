use std::path::Path;

use bytes::Bytes;

/// A named blob handed to the pipeline (uploaded, collected or downloaded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceFile {
    pub name: String,
    pub content: Bytes,
}

impl TraceFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, naming it after its final path component.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        Ok(Self::new(name, content))
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// Video associated with the loaded traces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenRecording {
    pub name: String,
    pub video: Bytes,
}
