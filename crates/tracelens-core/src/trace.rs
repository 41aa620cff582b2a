use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::{Timestamp, TimestampType};

/// Known trace types, in declared enumeration order.
///
/// The derived `Ord` follows declaration order, which is the order
/// [`Traces`] iterates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceType {
    SurfaceFlinger,
    WindowManager,
    Transactions,
    Transitions,
    ProtoLog,
    InputMethodClients,
    ViewCapture,
    EventLog,
    ScreenRecording,
}

impl TraceType {
    pub const ALL: [TraceType; 9] = [
        Self::SurfaceFlinger,
        Self::WindowManager,
        Self::Transactions,
        Self::Transitions,
        Self::ProtoLog,
        Self::InputMethodClients,
        Self::ViewCapture,
        Self::EventLog,
        Self::ScreenRecording,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SurfaceFlinger => "surface_flinger",
            Self::WindowManager => "window_manager",
            Self::Transactions => "transactions",
            Self::Transitions => "transitions",
            Self::ProtoLog => "proto_log",
            Self::InputMethodClients => "input_method_clients",
            Self::ViewCapture => "view_capture",
            Self::EventLog => "event_log",
            Self::ScreenRecording => "screen_recording",
        }
    }

    /// Title shown on the view presenting this trace.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SurfaceFlinger => "Surface Flinger",
            Self::WindowManager => "Window Manager",
            Self::Transactions => "Transactions",
            Self::Transitions => "Transitions",
            Self::ProtoLog => "ProtoLog",
            Self::InputMethodClients => "Input Method Clients",
            Self::ViewCapture => "View Capture",
            Self::EventLog => "Event Log",
            Self::ScreenRecording => "Screen Recording",
        }
    }
}

impl fmt::Display for TraceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown trace type: {0}")]
pub struct UnknownTraceType(pub String);

impl FromStr for TraceType {
    type Err = UnknownTraceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTraceType(s.to_string()))
    }
}

/// One entry of a concrete trace. Equality ignores the payload.
#[derive(Clone, Debug)]
pub struct TraceEntry {
    trace_type: TraceType,
    index: usize,
    timestamp: Timestamp,
    payload: Arc<Value>,
}

impl TraceEntry {
    pub fn trace_type(&self) -> TraceType {
        self.trace_type
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

impl PartialEq for TraceEntry {
    fn eq(&self, other: &Self) -> bool {
        self.trace_type == other.trace_type
            && self.index == other.index
            && self.timestamp == other.timestamp
    }
}

impl Eq for TraceEntry {}

/// A normalized, time-ordered sequence of entries of one trace type.
#[derive(Clone, Debug)]
pub struct Trace {
    trace_type: TraceType,
    timestamp_type: TimestampType,
    descriptors: Vec<String>,
    timestamps: Vec<Timestamp>,
    payloads: Vec<Arc<Value>>,
}

impl Trace {
    /// Build a trace; entries are stably sorted by timestamp.
    pub fn new(
        trace_type: TraceType,
        timestamp_type: TimestampType,
        descriptors: Vec<String>,
        mut entries: Vec<(Timestamp, Value)>,
    ) -> Self {
        debug_assert!(entries
            .iter()
            .all(|(ts, _)| ts.timestamp_type() == timestamp_type));
        entries.sort_by_key(|(ts, _)| ts.value_ns());
        let (timestamps, payloads) = entries
            .into_iter()
            .map(|(ts, payload)| (ts, Arc::new(payload)))
            .unzip();
        Self {
            trace_type,
            timestamp_type,
            descriptors,
            timestamps,
            payloads,
        }
    }

    pub fn trace_type(&self) -> TraceType {
        self.trace_type
    }

    pub fn timestamp_type(&self) -> TimestampType {
        self.timestamp_type
    }

    /// Names of the files this trace was built from.
    pub fn descriptors(&self) -> &[String] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn entry(&self, index: usize) -> Option<TraceEntry> {
        let timestamp = *self.timestamps.get(index)?;
        Some(TraceEntry {
            trace_type: self.trace_type,
            index,
            timestamp,
            payload: Arc::clone(&self.payloads[index]),
        })
    }

    pub fn find_first_greater_or_equal_entry(&self, timestamp: Timestamp) -> Option<TraceEntry> {
        let idx = self
            .timestamps
            .partition_point(|t| t.value_ns() < timestamp.value_ns());
        self.entry(idx)
    }

    pub fn find_last_lower_or_equal_entry(&self, timestamp: Timestamp) -> Option<TraceEntry> {
        let idx = self
            .timestamps
            .partition_point(|t| t.value_ns() <= timestamp.value_ns());
        idx.checked_sub(1).and_then(|i| self.entry(i))
    }

    /// Entry nearest to `timestamp`; ties go to the earlier entry.
    pub fn find_closest_entry(&self, timestamp: Timestamp) -> Option<TraceEntry> {
        if self.is_empty() {
            return None;
        }
        let target = timestamp.value_ns();
        let idx = self.timestamps.partition_point(|t| t.value_ns() < target);
        if idx == 0 {
            return self.entry(0);
        }
        if idx == self.len() {
            return self.entry(idx - 1);
        }
        let before = target.abs_diff(self.timestamps[idx - 1].value_ns());
        let after = self.timestamps[idx].value_ns().abs_diff(target);
        if after < before {
            self.entry(idx)
        } else {
            self.entry(idx - 1)
        }
    }

    pub fn first_valid_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.iter().copied().find(Timestamp::is_valid)
    }

    pub fn last_valid_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.iter().rev().copied().find(Timestamp::is_valid)
    }
}

/// Collection of traces keyed by type, iterated in declared enumeration order.
#[derive(Clone, Debug, Default)]
pub struct Traces {
    traces: BTreeMap<TraceType, Arc<Trace>>,
}

impl Traces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a trace, returning the one it replaced.
    pub fn insert(&mut self, trace: Trace) -> Option<Arc<Trace>> {
        self.traces.insert(trace.trace_type(), Arc::new(trace))
    }

    pub fn get(&self, trace_type: TraceType) -> Option<&Arc<Trace>> {
        self.traces.get(&trace_type)
    }

    pub fn contains(&self, trace_type: TraceType) -> bool {
        self.traces.contains_key(&trace_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Trace>> {
        self.traces.values()
    }

    pub fn trace_types(&self) -> Vec<TraceType> {
        self.traces.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

/// Assembles a [`Traces`] collection from per-type timestamps and payloads.
#[derive(Debug, Default)]
pub struct TracesBuilder {
    timestamps: BTreeMap<TraceType, Vec<Timestamp>>,
    entries: BTreeMap<TraceType, Vec<Value>>,
}

impl TracesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timestamps(mut self, trace_type: TraceType, timestamps: Vec<Timestamp>) -> Self {
        self.timestamps.insert(trace_type, timestamps);
        self
    }

    pub fn set_entries(mut self, trace_type: TraceType, entries: Vec<Value>) -> Self {
        self.entries.insert(trace_type, entries);
        self
    }

    pub fn build(mut self) -> Traces {
        let mut traces = Traces::new();
        for (trace_type, timestamps) in self.timestamps {
            let payloads = self.entries.remove(&trace_type).unwrap_or_default();
            let timestamp_type = timestamps
                .first()
                .map_or(TimestampType::Real, Timestamp::timestamp_type);
            let entries = timestamps
                .into_iter()
                .enumerate()
                .map(|(i, ts)| (ts, payloads.get(i).cloned().unwrap_or(Value::Null)))
                .collect();
            traces.insert(Trace::new(
                trace_type,
                timestamp_type,
                vec![trace_type.to_string()],
                entries,
            ));
        }
        traces
    }
}
