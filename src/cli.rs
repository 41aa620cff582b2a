use std::path::PathBuf;

use clap::Parser;
use tracelens_core::TraceType;

/// Load device traces and report the entries selected at a position.
#[derive(Parser, Debug)]
#[command(name = "tracelens", about = "Synchronized trace inspection")]
pub struct Cli {
    /// Trace documents, bundles or screen recordings to open.
    pub files: Vec<PathBuf>,

    /// Upload the files and build on a separate trace-view request instead
    /// of collecting them in one step.
    #[arg(long)]
    pub upload: bool,

    /// Move to this timestamp (nanoseconds, on the timeline's clock) after loading.
    #[arg(long)]
    pub position: Option<i64>,

    /// Pretend the companion tool sent this real-clock timestamp before loading.
    #[arg(long)]
    pub remote_timestamp: Option<i64>,

    /// Focus the tab presenting this trace type (e.g. `window_manager`).
    #[arg(long)]
    pub focus: Option<TraceType>,

    /// Settings file (defaults to `~/.tracelens/settings.json`).
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Exchange cross-tool messages as JSON lines on stdin/stdout until
    /// stdin closes.
    #[arg(long)]
    pub listen: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "tracelens",
            "wm.json",
            "sf.json",
            "--focus",
            "surface_flinger",
            "--position",
            "42",
            "--upload",
        ]);
        assert_eq!(cli.files.len(), 2);
        assert_eq!(cli.focus, Some(TraceType::SurfaceFlinger));
        assert_eq!(cli.position, Some(42));
        assert!(cli.upload);
        assert!(!cli.listen);
    }

    #[test]
    fn rejects_unknown_trace_type() {
        assert!(Cli::try_parse_from(["tracelens", "--focus", "nope"]).is_err());
    }
}
