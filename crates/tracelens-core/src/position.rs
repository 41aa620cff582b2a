use crate::time::Timestamp;
use crate::trace::{Trace, TraceEntry, TraceType};

/// A point in the unified timeline, optionally anchored to a concrete entry.
///
/// A position built from an entry carries that entry's trace-type affinity;
/// a position built from a bare timestamp carries none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracePosition {
    timestamp: Timestamp,
    entry: Option<TraceEntry>,
}

impl TracePosition {
    pub fn from_timestamp(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            entry: None,
        }
    }

    /// Anchor to `entry`. The position's timestamp defaults to the entry's.
    pub fn from_trace_entry(entry: TraceEntry, explicit_timestamp: Option<Timestamp>) -> Self {
        Self {
            timestamp: explicit_timestamp.unwrap_or_else(|| entry.timestamp()),
            entry: Some(entry),
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn entry(&self) -> Option<&TraceEntry> {
        self.entry.as_ref()
    }

    pub fn trace_type(&self) -> Option<TraceType> {
        self.entry.as_ref().map(TraceEntry::trace_type)
    }

    /// Entry of `trace` selected at this position: the anchor entry if it
    /// belongs to `trace`, else the last entry at or before the timestamp.
    pub fn select_entry_in(&self, trace: &Trace) -> Option<TraceEntry> {
        match &self.entry {
            Some(entry) if entry.trace_type() == trace.trace_type() => Some(entry.clone()),
            _ => trace.find_last_lower_or_equal_entry(self.timestamp),
        }
    }
}
