//! Segment recorder — one bounded-duration ffmpeg invocation per call.
//!
//! Output layout is `<root>/<YYYY-MM>/<YYYY-MM-DD_HH-MM-SS>.mp4`, derived
//! from the moment recording starts. Downstream indexing and cleanup address
//! files by this scheme, so it must not change.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::error::RewinderError;

pub const SEGMENT_EXTENSION: &str = "mp4";

/// One finalized segment: the month directory and the file inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSegment {
    pub dir: PathBuf,
    pub file_name: String,
}

impl RecordedSegment {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Something that can produce one segment per call. The scheduler only
/// talks to this trait, so tests can substitute a fake.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Record one segment to completion. Blocks the calling task for the
    /// segment duration plus encoder overhead.
    async fn record(&self) -> Result<RecordedSegment>;
}

/// Derive the month directory and file name for a segment starting at `at`.
pub fn segment_paths(output_root: &Path, at: DateTime<Local>) -> RecordedSegment {
    RecordedSegment {
        dir: output_root.join(at.format("%Y-%m").to_string()),
        file_name: format!(
            "{}.{}",
            at.format("%Y-%m-%d_%H-%M-%S"),
            SEGMENT_EXTENSION
        ),
    }
}

/// Drives the external encoder. Cheap to clone via `Arc`; stateless between
/// calls apart from the marker file it refreshes.
pub struct SegmentRecorder {
    ffmpeg_path: String,
    output_root: PathBuf,
    liveness_marker: PathBuf,
    segment_seconds: u64,
    target_resolution: Option<(u32, u32)>,
}

impl SegmentRecorder {
    pub fn new(
        ffmpeg_path: String,
        output_root: PathBuf,
        liveness_marker: PathBuf,
        segment_seconds: u64,
        target_resolution: Option<(u32, u32)>,
    ) -> Self {
        Self {
            ffmpeg_path,
            output_root,
            liveness_marker,
            segment_seconds,
            target_resolution,
        }
    }

    /// Platform-specific "grab the whole desktop" input arguments.
    fn desktop_input_args() -> Vec<String> {
        #[cfg(target_os = "windows")]
        {
            vec!["-f".into(), "gdigrab".into(), "-framerate".into(), "2".into(), "-i".into(), "desktop".into()]
        }

        #[cfg(target_os = "macos")]
        {
            // avfoundation device "<video>:<audio>"; screen devices follow the
            // cameras, "1:none" is the first screen on a camera-equipped Mac.
            vec!["-f".into(), "avfoundation".into(), "-framerate".into(), "2".into(), "-i".into(), "1:none".into()]
        }

        #[cfg(target_os = "linux")]
        {
            let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0".into());
            vec!["-f".into(), "x11grab".into(), "-framerate".into(), "2".into(), "-i".into(), display]
        }
    }

    /// Build the full encoder argument list for a segment at `out_path`.
    fn encoder_args(&self, out_path: &Path) -> Vec<String> {
        let mut args = vec!["-y".to_string()];
        args.extend(Self::desktop_input_args());
        if let Some((w, h)) = self.target_resolution {
            args.push("-vf".into());
            args.push(format!("scale={w}:{h}"));
        }
        // Low-bitrate archival encode: long GOP, generous B-frames, eager
        // scene-cut threshold. One segment per invocation via -t.
        args.extend(
            [
                "-c:v", "libx264",
                "-b:v", "200k",
                "-bf", "8",
                "-g", "600",
                "-sc_threshold", "10",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push("-t".into());
        args.push(self.segment_seconds.to_string());
        args.push(out_path.to_string_lossy().into_owned());
        args
    }

    /// Write this process's pid to the liveness marker. Advisory only — an
    /// external monitor reads it to see which process owns the recorder.
    async fn refresh_liveness_marker(&self) -> Result<()> {
        if let Some(parent) = self.liveness_marker.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.liveness_marker, process::id().to_string())
            .await
            .with_context(|| {
                format!(
                    "failed to write liveness marker {}",
                    self.liveness_marker.display()
                )
            })
    }
}

#[async_trait]
impl SegmentSource for SegmentRecorder {
    async fn record(&self) -> Result<RecordedSegment> {
        let segment = segment_paths(&self.output_root, Local::now());
        tokio::fs::create_dir_all(&segment.dir)
            .await
            .with_context(|| format!("failed to create {}", segment.dir.display()))?;

        self.refresh_liveness_marker().await?;

        let out_path = segment.path();
        let args = self.encoder_args(&out_path);
        let command_line = format!("{} {}", self.ffmpeg_path, args.join(" "));
        debug!("invoking encoder: {command_line}");

        info!(
            "recording segment {} ({}s)",
            out_path.display(),
            self.segment_seconds
        );

        let status = tokio::process::Command::new(&self.ffmpeg_path)
            .args(&args)
            .status()
            .await
            .with_context(|| format!("failed to spawn encoder: {command_line}"))?;

        if !status.success() {
            return Err(RewinderError::EncodingFailure {
                command: command_line,
                code: status.code().unwrap_or(-1),
            }
            .into());
        }

        info!("segment finalized: {}", out_path.display());
        Ok(segment)
    }
}

/// Whether the encoder capability exists on this host at all.
/// Checked once at startup, before any worker is started.
pub async fn probe_ffmpeg(ffmpeg_path: &str) -> bool {
    tokio::process::Command::new(ffmpeg_path)
        .arg("-version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_segment_path_layout() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 2).unwrap();
        let segment = segment_paths(Path::new("/videos"), at);
        assert_eq!(segment.dir, PathBuf::from("/videos/2026-03"));
        assert_eq!(segment.file_name, "2026-03-07_09-05-02.mp4");
        assert_eq!(
            segment.path(),
            PathBuf::from("/videos/2026-03/2026-03-07_09-05-02.mp4")
        );
    }

    #[test]
    fn test_encoder_args_end_with_duration_and_path() {
        let recorder = SegmentRecorder::new(
            "ffmpeg".into(),
            PathBuf::from("/videos"),
            PathBuf::from("/tmp/record.lock"),
            900,
            Some((1600, 900)),
        );
        let args = recorder.encoder_args(Path::new("/videos/2026-03/x.mp4"));
        assert!(args.contains(&"scale=1600:900".to_string()));
        let n = args.len();
        assert_eq!(args[n - 3], "-t");
        assert_eq!(args[n - 2], "900");
        assert_eq!(args[n - 1], "/videos/2026-03/x.mp4");
    }

    #[test]
    fn test_encoder_args_skip_scale_when_unset() {
        let recorder = SegmentRecorder::new(
            "ffmpeg".into(),
            PathBuf::from("/videos"),
            PathBuf::from("/tmp/record.lock"),
            900,
            None,
        );
        let args = recorder.encoder_args(Path::new("/videos/x.mp4"));
        assert!(!args.iter().any(|a| a.starts_with("scale=")));
    }

    #[tokio::test]
    async fn test_record_surfaces_encoding_failure() {
        let dir = tempfile::tempdir().unwrap();
        // `false` accepts any arguments and exits 1.
        let recorder = SegmentRecorder::new(
            "false".into(),
            dir.path().join("videos"),
            dir.path().join("record.lock"),
            1,
            None,
        );
        let err = recorder.record().await.unwrap_err();
        match err.downcast_ref::<RewinderError>() {
            Some(RewinderError::EncodingFailure { code, .. }) => assert_eq!(*code, 1),
            other => panic!("expected EncodingFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_record_refreshes_liveness_marker() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("record.lock");
        let recorder = SegmentRecorder::new(
            "true".into(),
            dir.path().join("videos"),
            marker.clone(),
            1,
            None,
        );
        // `true` exits 0 without producing a file; the marker is written
        // before the encoder is invoked either way.
        recorder.record().await.unwrap();
        let pid: u32 = std::fs::read_to_string(&marker).unwrap().parse().unwrap();
        assert_eq!(pid, process::id());
    }
}
