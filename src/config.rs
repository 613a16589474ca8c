//! Unified recording configuration, built once from CLI args and handed to
//! every subsystem. Marker-file paths are derived here so the recorder, the
//! singleton guard and the maintenance gate all agree on them.

use std::path::PathBuf;

use crate::recorder::SegmentRecorder;

#[derive(Clone, Debug)]
pub struct RecordingConfig {
    /// Base directory for markers and logs (default `~/.rewinder`).
    pub data_dir: PathBuf,
    /// Root of the video output tree (`<root>/<YYYY-MM>/...`).
    pub output_root: PathBuf,

    // Capture
    /// Length of one video segment in seconds (the rotation unit).
    pub segment_seconds: u64,
    /// Optional `WxH` the encoder scales to. Choosing a good value for the
    /// host display is the caller's concern, not ours.
    pub target_resolution: Option<(u32, u32)>,
    pub ffmpeg_path: String,

    // Idle detection
    /// Staleness rank above which recording pauses. 0 disables idle
    /// detection entirely — the scheduler then always records.
    pub idle_threshold: f64,

    // Maintenance
    pub maintenance_cooldown: chrono::Duration,

    // Indexing handoff
    pub enable_indexing: bool,

    pub debug: bool,
}

impl RecordingConfig {
    /// Marker holding the recorder's pid. Existence is what the singleton
    /// guard checks at startup; the recorder refreshes it before each
    /// encoder invocation.
    pub fn liveness_marker_path(&self) -> PathBuf {
        self.data_dir.join("record.lock")
    }

    /// Durable timestamp of the last approved idle maintenance run.
    pub fn maintenance_marker_path(&self) -> PathBuf {
        self.data_dir.join("last_idle_maintain")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Build the segment recorder for this config.
    pub fn to_segment_recorder(&self) -> SegmentRecorder {
        SegmentRecorder::new(
            self.ffmpeg_path.clone(),
            self.output_root.clone(),
            self.liveness_marker_path(),
            self.segment_seconds,
            self.target_resolution,
        )
    }
}
