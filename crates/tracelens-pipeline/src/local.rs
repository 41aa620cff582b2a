use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use tracelens_core::{
    LoadError, ProgressListener, ScreenRecording, TimeRange, TimestampType, Trace, TraceFile,
    Traces,
};

use crate::archive;
use crate::format::{self, ParsedTrace};
use crate::pipeline::{FilesSource, TracePipeline};

const SCREEN_RECORDING_EXTENSION: &str = "mp4";

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Traces ending this long before the newest trace are discarded.
    pub old_data_threshold: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            old_data_threshold: Duration::from_secs(5 * 60),
        }
    }
}

/// In-process pipeline over normalized JSON trace documents.
#[derive(Debug, Default)]
pub struct LocalTracePipeline {
    config: PipelineConfig,
    loaded: Vec<ParsedTrace>,
    screen_recording: Option<ScreenRecording>,
    traces: Traces,
    built: bool,
}

impl LocalTracePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn add_parsed(&mut self, parsed: ParsedTrace, errors: &mut Vec<LoadError>) {
        if let Some(pos) = self
            .loaded
            .iter()
            .position(|t| t.trace_type == parsed.trace_type)
        {
            let previous = self.loaded.remove(pos);
            errors.push(LoadError::TraceOverridden {
                descriptor: previous.descriptor,
            });
        }
        self.loaded.push(parsed);
    }

    fn add_screen_recording(&mut self, file: TraceFile, errors: &mut Vec<LoadError>) {
        let recording = ScreenRecording {
            name: file.name,
            video: file.content,
        };
        if let Some(previous) = self.screen_recording.replace(recording) {
            errors.push(LoadError::TraceOverridden {
                descriptor: previous.name,
            });
        }
    }

    fn common_timestamp_type(&self) -> Option<TimestampType> {
        [TimestampType::Real, TimestampType::Elapsed]
            .into_iter()
            .find(|ty| self.loaded.iter().all(|t| t.supports(*ty)))
    }

    fn discard_old_data(&self, traces: Vec<Trace>, errors: &mut Vec<LoadError>) -> Traces {
        let newest_end = traces
            .iter()
            .filter_map(|t| t.last_valid_timestamp())
            .max_by_key(|ts| ts.value_ns());
        let threshold_ns =
            i64::try_from(self.config.old_data_threshold.as_nanos()).unwrap_or(i64::MAX);

        let mut out = Traces::new();
        for trace in traces {
            if let (Some(end), Some(newest)) = (trace.last_valid_timestamp(), newest_end) {
                let time_gap = TimeRange::new(end, newest);
                if time_gap.duration_ns() > threshold_ns {
                    let descriptor = trace.descriptors().join(", ");
                    warn!(%descriptor, gap = %time_gap.format_duration(), "discarding old trace");
                    errors.push(LoadError::TraceHasOldData {
                        descriptor,
                        time_gap,
                    });
                    continue;
                }
            }
            let _ = out.insert(trace);
        }
        out
    }
}

#[async_trait]
impl TracePipeline for LocalTracePipeline {
    async fn load_files(
        &mut self,
        files: Vec<TraceFile>,
        progress: Option<Arc<dyn ProgressListener>>,
        source: FilesSource,
    ) -> Vec<LoadError> {
        info!(%source, files = files.len(), "loading files");
        let (files, mut errors) = archive::flatten(files);
        let total = files.len();
        let mut usable = 0usize;
        self.built = false;

        for (i, file) in files.into_iter().enumerate() {
            if let Some(listener) = &progress {
                let percent = (i + 1) as f64 * 100.0 / total as f64;
                listener.on_progress_update(&format!("Parsing {}", file.name), Some(percent));
            }
            if file.has_extension(SCREEN_RECORDING_EXTENSION) {
                debug!(name = %file.name, "screen recording");
                self.add_screen_recording(file, &mut errors);
                usable += 1;
                continue;
            }
            match format::parse_trace(&file.name, &file.content) {
                Ok(parsed) => {
                    debug!(
                        name = %file.name,
                        trace_type = %parsed.trace_type,
                        entries = parsed.entries.len(),
                        "parsed trace"
                    );
                    self.add_parsed(parsed, &mut errors);
                    usable += 1;
                }
                Err(err) => errors.push(err),
            }
        }

        if usable == 0 {
            errors.push(LoadError::NoInputFiles);
        }
        if let Some(listener) = &progress {
            listener.on_operation_finished();
        }
        errors
    }

    async fn build_traces(&mut self) -> Vec<LoadError> {
        if self.built {
            debug!("traces already built for this load cycle");
            return Vec::new();
        }
        self.built = true;
        self.traces = Traces::new();

        let mut errors = Vec::new();
        if self.loaded.is_empty() {
            return errors;
        }
        let Some(timestamp_type) = self.common_timestamp_type() else {
            errors.push(LoadError::NoCommonTimestampType);
            return errors;
        };

        let traces = self
            .loaded
            .iter()
            .cloned()
            .map(|parsed| parsed.into_trace(timestamp_type))
            .collect();
        self.traces = self.discard_old_data(traces, &mut errors);
        info!(traces = self.traces.len(), %timestamp_type, "traces built");
        errors
    }

    fn traces(&self) -> Traces {
        self.traces.clone()
    }

    fn screen_recording_video(&self) -> Option<ScreenRecording> {
        self.screen_recording.clone()
    }

    fn clear(&mut self) {
        self.loaded.clear();
        self.screen_recording = None;
        self.traces = Traces::new();
        self.built = false;
    }
}
