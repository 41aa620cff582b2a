//! Normalized JSON trace documents.
//!
//! Decoding the individual on-device formats happens upstream; this crate
//! only sees documents of the shape
//! `{"type": "window_manager", "entries": [{"elapsed_ns": 1, "real_ns": 2, "data": {..}}]}`.

use serde::Deserialize;
use serde_json::Value;

use tracelens_core::{LoadError, Timestamp, TimestampType, Trace, TraceType};

#[derive(Deserialize)]
struct TraceDocument {
    #[serde(rename = "type")]
    trace_type: TraceType,
    #[serde(default)]
    entries: Vec<DocumentEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DocumentEntry {
    #[serde(default)]
    pub elapsed_ns: Option<i64>,
    #[serde(default)]
    pub real_ns: Option<i64>,
    #[serde(default)]
    pub data: Value,
}

impl DocumentEntry {
    fn timestamp(&self, timestamp_type: TimestampType) -> Option<Timestamp> {
        let value = match timestamp_type {
            TimestampType::Real => self.real_ns,
            TimestampType::Elapsed => self.elapsed_ns,
        }?;
        Some(Timestamp::new(timestamp_type, value))
    }
}

/// A parsed file, not yet committed to a timestamp type.
#[derive(Clone, Debug)]
pub struct ParsedTrace {
    pub descriptor: String,
    pub trace_type: TraceType,
    pub entries: Vec<DocumentEntry>,
}

impl ParsedTrace {
    /// True when every entry carries a timestamp of `timestamp_type`.
    pub fn supports(&self, timestamp_type: TimestampType) -> bool {
        self.entries
            .iter()
            .all(|e| e.timestamp(timestamp_type).is_some())
    }

    /// Build the trace on `timestamp_type`. Entries lacking that timestamp
    /// are dropped, so check [`ParsedTrace::supports`] first.
    pub fn into_trace(self, timestamp_type: TimestampType) -> Trace {
        let entries = self
            .entries
            .into_iter()
            .filter_map(|e| Some((e.timestamp(timestamp_type)?, e.data)))
            .collect();
        Trace::new(
            self.trace_type,
            timestamp_type,
            vec![self.descriptor],
            entries,
        )
    }
}

pub fn parse_trace(descriptor: &str, content: &[u8]) -> Result<ParsedTrace, LoadError> {
    let doc: TraceDocument =
        serde_json::from_slice(content).map_err(|_| LoadError::UnsupportedFileFormat {
            descriptor: descriptor.to_string(),
        })?;
    Ok(ParsedTrace {
        descriptor: descriptor.to_string(),
        trace_type: doc.trace_type,
        entries: doc.entries,
    })
}
