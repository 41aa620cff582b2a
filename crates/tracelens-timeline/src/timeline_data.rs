//! The authoritative cross-trace time cursor.
//!
//! `TimelineData` is re-initialized on every build and cleared on reset. It
//! owns the loaded trace collection, the trace types relevant to the focused
//! view and the current [`TracePosition`], and answers "which entry of trace
//! X is selected right now" for every consumer.

use std::sync::Arc;

use tracelens_core::{
    ScreenRecording, TimeRange, Timestamp, TimestampType, Trace, TraceEntry, TracePosition,
    TraceType, Traces,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error("{trace_type} uses {found} timestamps but the timeline uses {expected}")]
    MixedTimestampTypes {
        trace_type: TraceType,
        expected: TimestampType,
        found: TimestampType,
    },
}

#[derive(Debug, Default)]
pub struct TimelineData {
    traces: Traces,
    screen_recording: Option<ScreenRecording>,
    timestamp_type: Option<TimestampType>,
    first_timestamp: Option<Timestamp>,
    last_timestamp: Option<Timestamp>,
    active_view_trace_types: Vec<TraceType>,
    explicitly_set_position: Option<TracePosition>,
    initialized: bool,
}

impl TimelineData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a freshly built collection. Any previous state is dropped first.
    ///
    /// All non-empty traces must share one timestamp type.
    pub fn initialize(
        &mut self,
        traces: Traces,
        screen_recording: Option<ScreenRecording>,
    ) -> Result<(), TimelineError> {
        self.clear();

        let mut timestamp_type = None;
        for trace in traces.iter().filter(|t| !t.is_empty()) {
            match timestamp_type {
                None => timestamp_type = Some(trace.timestamp_type()),
                Some(expected) if expected != trace.timestamp_type() => {
                    return Err(TimelineError::MixedTimestampTypes {
                        trace_type: trace.trace_type(),
                        expected,
                        found: trace.timestamp_type(),
                    });
                }
                Some(_) => {}
            }
        }
        let timestamp_type =
            timestamp_type.or_else(|| traces.iter().next().map(|t| t.timestamp_type()));

        self.first_timestamp = traces
            .iter()
            .filter_map(|t| t.first_valid_timestamp())
            .min_by_key(Timestamp::value_ns);
        self.last_timestamp = traces
            .iter()
            .filter_map(|t| t.last_valid_timestamp())
            .max_by_key(Timestamp::value_ns);
        self.timestamp_type = timestamp_type;
        self.screen_recording = screen_recording;
        self.traces = traces;
        self.initialized = true;

        debug!(
            traces = self.traces.len(),
            timestamp_type = ?self.timestamp_type,
            "timeline initialized"
        );
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn traces(&self) -> &Traces {
        &self.traces
    }

    pub fn screen_recording(&self) -> Option<&ScreenRecording> {
        self.screen_recording.as_ref()
    }

    pub fn timestamp_type(&self) -> Option<TimestampType> {
        self.timestamp_type
    }

    /// Set (or with `None`, unset) the explicit position.
    ///
    /// A position on a different clock domain than the timeline is rejected
    /// and `false` returned.
    pub fn set_position(&mut self, position: Option<TracePosition>) -> bool {
        if let (Some(pos), Some(expected)) = (&position, self.timestamp_type) {
            let found = pos.timestamp().timestamp_type();
            if found != expected {
                warn!(%found, %expected, "ignoring position with mismatching timestamp type");
                return false;
            }
        }
        self.explicitly_set_position = position;
        true
    }

    /// The explicit position, else the first entry of the active view's
    /// traces, else the first entry of the whole timeline. Entries with
    /// invalid (zero) timestamps are never picked as a default.
    pub fn current_position(&self) -> Option<TracePosition> {
        if let Some(position) = &self.explicitly_set_position {
            return Some(position.clone());
        }
        let active = self
            .active_view_trace_types
            .iter()
            .filter_map(|t| self.traces.get(*t));
        if let Some(entry) = earliest_valid_entry(active) {
            return Some(TracePosition::from_trace_entry(entry, None));
        }
        earliest_valid_entry(self.traces.iter())
            .map(|entry| TracePosition::from_trace_entry(entry, None))
    }

    pub fn set_active_view_trace_types(&mut self, types: Vec<TraceType>) {
        debug!(?types, "active view trace types changed");
        self.active_view_trace_types = types;
    }

    pub fn active_view_trace_types(&self) -> &[TraceType] {
        &self.active_view_trace_types
    }

    /// Position at `timestamp`, anchored to the closest entry of the first
    /// loaded active-view trace when there is one.
    pub fn make_position_from_active_trace(&self, timestamp: Timestamp) -> TracePosition {
        let trace = self
            .active_view_trace_types
            .iter()
            .find_map(|t| self.traces.get(*t));
        match trace.and_then(|t| t.find_closest_entry(timestamp)) {
            Some(entry) => TracePosition::from_trace_entry(entry, Some(timestamp)),
            None => TracePosition::from_timestamp(timestamp),
        }
    }

    /// Entry of `trace_type` selected by the current position: the
    /// position's own entry if it belongs to that trace, otherwise the last
    /// entry at or before the position's timestamp.
    pub fn find_current_entry_for(&self, trace_type: TraceType) -> Option<TraceEntry> {
        let trace = self.traces.get(trace_type)?;
        self.current_position()?.select_entry_in(trace)
    }

    pub fn find_previous_entry_for(&self, trace_type: TraceType) -> Option<TraceEntry> {
        let current = self.find_current_entry_for(trace_type)?;
        let index = current.index().checked_sub(1)?;
        self.traces.get(trace_type)?.entry(index)
    }

    /// Entry after the current one; the first entry when none is selected yet.
    pub fn find_next_entry_for(&self, trace_type: TraceType) -> Option<TraceEntry> {
        let trace = self.traces.get(trace_type)?;
        match self.find_current_entry_for(trace_type) {
            Some(current) => trace.entry(current.index() + 1),
            None => trace.entry(0),
        }
    }

    pub fn has_previous_entry(&self, trace_type: TraceType) -> bool {
        self.find_previous_entry_for(trace_type).is_some()
    }

    pub fn has_next_entry(&self, trace_type: TraceType) -> bool {
        self.find_next_entry_for(trace_type).is_some()
    }

    pub fn has_timestamps(&self) -> bool {
        self.first_timestamp.is_some()
    }

    pub fn has_more_than_one_distinct_timestamp(&self) -> bool {
        matches!(
            (self.first_timestamp, self.last_timestamp),
            (Some(first), Some(last)) if first != last
        )
    }

    /// Span between the first and last valid timestamps of all traces.
    pub fn time_range(&self) -> Option<TimeRange> {
        Some(TimeRange::new(self.first_timestamp?, self.last_timestamp?))
    }
}

fn earliest_valid_entry<'a, I>(traces: I) -> Option<TraceEntry>
where
    I: Iterator<Item = &'a Arc<Trace>>,
{
    traces
        .filter_map(|trace| {
            let ts = trace.first_valid_timestamp()?;
            trace.find_first_greater_or_equal_entry(ts)
        })
        // min_by_key keeps the first of equal keys, i.e. declared order
        .min_by_key(|entry| entry.timestamp().value_ns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelens_core::TracesBuilder;

    fn three_traces() -> Traces {
        TracesBuilder::new()
            .set_timestamps(TraceType::SurfaceFlinger, vec![Timestamp::real(10)])
            .set_timestamps(TraceType::WindowManager, vec![Timestamp::real(11)])
            .set_timestamps(TraceType::Transactions, vec![Timestamp::real(12)])
            .set_timestamps(TraceType::ProtoLog, vec![])
            .build()
    }

    fn initialized(traces: Traces) -> TimelineData {
        let mut timeline = TimelineData::new();
        timeline.initialize(traces, None).unwrap();
        timeline
    }

    #[test]
    fn selected_entries_follow_position() {
        let mut timeline = initialized(three_traces());
        timeline.set_position(Some(TracePosition::from_timestamp(Timestamp::real(11))));

        assert_eq!(
            timeline
                .find_current_entry_for(TraceType::SurfaceFlinger)
                .unwrap()
                .timestamp(),
            Timestamp::real(10)
        );
        assert_eq!(
            timeline
                .find_current_entry_for(TraceType::WindowManager)
                .unwrap()
                .timestamp(),
            Timestamp::real(11)
        );
        assert!(timeline.find_current_entry_for(TraceType::Transactions).is_none());
        assert!(timeline.find_current_entry_for(TraceType::ProtoLog).is_none());
    }

    #[test]
    fn default_position_is_first_entry() {
        let timeline = initialized(three_traces());
        let position = timeline.current_position().unwrap();
        assert_eq!(position.trace_type(), Some(TraceType::SurfaceFlinger));
        assert_eq!(position.timestamp(), Timestamp::real(10));
        // initially only the first entry of SF is selected
        assert!(timeline.find_current_entry_for(TraceType::SurfaceFlinger).is_some());
        assert!(timeline.find_current_entry_for(TraceType::WindowManager).is_none());
    }

    #[test]
    fn default_position_prefers_active_view_traces() {
        let mut timeline = initialized(three_traces());
        timeline.set_active_view_trace_types(vec![TraceType::Transactions]);
        let position = timeline.current_position().unwrap();
        assert_eq!(position.trace_type(), Some(TraceType::Transactions));
        assert_eq!(position.timestamp(), Timestamp::real(12));
    }

    #[test]
    fn dump_only_timeline_has_no_default_position() {
        let traces = TracesBuilder::new()
            .set_timestamps(TraceType::WindowManager, vec![Timestamp::real(0)])
            .build();
        let timeline = initialized(traces);
        assert!(timeline.current_position().is_none());
        assert!(!timeline.has_timestamps());
        assert!(timeline.time_range().is_none());
    }

    #[test]
    fn mixed_timestamp_types_rejected() {
        let traces = TracesBuilder::new()
            .set_timestamps(TraceType::SurfaceFlinger, vec![Timestamp::real(10)])
            .set_timestamps(TraceType::WindowManager, vec![Timestamp::elapsed(11)])
            .build();
        let mut timeline = TimelineData::new();
        let err = timeline.initialize(traces, None).unwrap_err();
        assert_eq!(
            err,
            TimelineError::MixedTimestampTypes {
                trace_type: TraceType::WindowManager,
                expected: TimestampType::Real,
                found: TimestampType::Elapsed,
            }
        );
        assert!(!timeline.is_initialized());
    }

    #[test]
    fn position_with_other_timestamp_type_is_ignored() {
        let mut timeline = initialized(three_traces());
        assert!(!timeline.set_position(Some(TracePosition::from_timestamp(Timestamp::elapsed(11)))));
        assert_eq!(timeline.current_position().unwrap().timestamp(), Timestamp::real(10));
        assert!(timeline.set_position(Some(TracePosition::from_timestamp(Timestamp::real(12)))));
    }

    #[test]
    fn make_position_without_active_trace_is_bare() {
        let timeline = initialized(three_traces());
        let position = timeline.make_position_from_active_trace(Timestamp::real(11));
        assert_eq!(position, TracePosition::from_timestamp(Timestamp::real(11)));
    }

    #[test]
    fn make_position_anchors_to_closest_active_entry() {
        let traces = TracesBuilder::new()
            .set_timestamps(
                TraceType::WindowManager,
                vec![Timestamp::real(10), Timestamp::real(20), Timestamp::real(30)],
            )
            .build();
        let mut timeline = initialized(traces);
        timeline.set_active_view_trace_types(vec![TraceType::EventLog, TraceType::WindowManager]);

        let position = timeline.make_position_from_active_trace(Timestamp::real(19));
        assert_eq!(position.timestamp(), Timestamp::real(19));
        let entry = position.entry().unwrap();
        assert_eq!(entry.trace_type(), TraceType::WindowManager);
        assert_eq!(entry.index(), 1);
    }

    #[test]
    fn entry_affinity_wins_over_timestamp_search() {
        let traces = TracesBuilder::new()
            .set_timestamps(
                TraceType::WindowManager,
                vec![Timestamp::real(10), Timestamp::real(20)],
            )
            .build();
        let mut timeline = initialized(traces.clone());
        let later = traces.get(TraceType::WindowManager).unwrap().entry(1).unwrap();
        timeline.set_position(Some(TracePosition::from_trace_entry(
            later,
            Some(Timestamp::real(15)),
        )));
        assert_eq!(
            timeline.find_current_entry_for(TraceType::WindowManager).unwrap().index(),
            1
        );
    }

    #[test]
    fn navigation_between_entries() {
        let traces = TracesBuilder::new()
            .set_timestamps(
                TraceType::ProtoLog,
                vec![Timestamp::real(10), Timestamp::real(20), Timestamp::real(30)],
            )
            .set_timestamps(TraceType::EventLog, vec![Timestamp::real(25)])
            .build();
        let mut timeline = initialized(traces);
        timeline.set_position(Some(TracePosition::from_timestamp(Timestamp::real(20))));

        assert_eq!(timeline.find_previous_entry_for(TraceType::ProtoLog).unwrap().index(), 0);
        assert_eq!(timeline.find_next_entry_for(TraceType::ProtoLog).unwrap().index(), 2);
        assert!(!timeline.has_previous_entry(TraceType::EventLog));
        assert_eq!(timeline.find_next_entry_for(TraceType::EventLog).unwrap().index(), 0);

        timeline.set_position(Some(TracePosition::from_timestamp(Timestamp::real(30))));
        assert!(!timeline.has_next_entry(TraceType::ProtoLog));
        assert!(timeline.has_previous_entry(TraceType::ProtoLog));
    }

    #[test]
    fn time_range_spans_valid_timestamps() {
        let timeline = initialized(three_traces());
        let range = timeline.time_range().unwrap();
        assert_eq!(range.from, Timestamp::real(10));
        assert_eq!(range.to, Timestamp::real(12));
        assert!(timeline.has_more_than_one_distinct_timestamp());
        assert_eq!(timeline.timestamp_type(), Some(TimestampType::Real));
    }

    #[test]
    fn clear_resets_everything() {
        let mut timeline = initialized(three_traces());
        timeline.set_active_view_trace_types(vec![TraceType::WindowManager]);
        timeline.set_position(Some(TracePosition::from_timestamp(Timestamp::real(11))));

        timeline.clear();
        assert!(!timeline.is_initialized());
        assert!(timeline.current_position().is_none());
        assert!(timeline.active_view_trace_types().is_empty());
        assert!(timeline.timestamp_type().is_none());
        assert!(timeline.traces().is_empty());
    }

    #[test]
    fn screen_recording_is_kept() {
        let mut timeline = TimelineData::new();
        let video = ScreenRecording {
            name: "screen.mp4".into(),
            video: vec![1u8, 2, 3].into(),
        };
        timeline.initialize(three_traces(), Some(video.clone())).unwrap();
        assert_eq!(timeline.screen_recording(), Some(&video));
    }
}
