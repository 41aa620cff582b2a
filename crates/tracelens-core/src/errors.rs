use crate::time::TimeRange;

/// User-visible load conditions. None of these abort the process: the
/// pipeline collects them and the host surfaces them as notifications.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("{file}: corrupted archive")]
    CorruptedArchive { file: String },

    #[error("{descriptor}: unsupported format")]
    UnsupportedFileFormat { descriptor: String },

    #[error("Input has no valid trace files")]
    NoInputFiles,

    #[error("Failed to load traces because no common timestamp type could be found")]
    NoCommonTimestampType,

    #[error("{descriptor}: overridden by another trace of same type")]
    TraceOverridden { descriptor: String },

    #[error("{descriptor}: discarded because data is older than {}", .time_gap.format_duration())]
    TraceHasOldData {
        descriptor: String,
        time_gap: TimeRange,
    },
}

impl LoadError {
    /// Short classification string for logging and notification grouping.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::CorruptedArchive { .. } => "corrupted archive",
            Self::UnsupportedFileFormat { .. } => "unsupported format",
            Self::NoInputFiles => "no input",
            Self::NoCommonTimestampType => "no common timestamp",
            Self::TraceOverridden { .. } => "trace overridden",
            Self::TraceHasOldData { .. } => "old trace",
        }
    }
}
