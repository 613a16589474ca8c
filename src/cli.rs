//! Command-line surface. Single entry point, no subcommands.

use std::path::PathBuf;

use clap::Parser;

use crate::config::RecordingConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "rewinder", about = "records your desktop into timestamped video segments, pausing when nothing changes")]
pub struct Cli {
    /// Base directory for markers and logs (default: ~/.rewinder)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Root directory for recorded video segments (default: <data-dir>/videos)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Length of one video segment in seconds
    #[arg(long, default_value_t = 900)]
    pub segment_seconds: u64,

    /// Staleness rank above which recording pauses. 0 disables idle detection
    #[arg(long, default_value_t = 1.0)]
    pub idle_threshold: f64,

    /// Minimum hours between idle maintenance runs
    #[arg(long, default_value_t = 8)]
    pub maintenance_cooldown_hours: u64,

    /// Scale captured video to this resolution, e.g. 1600x900
    #[arg(long, value_parser = parse_resolution)]
    pub resolution: Option<(u32, u32)>,

    /// Path to the ffmpeg binary
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg_path: String,

    /// Skip the indexing handoff after each finished segment
    #[arg(long, default_value_t = false)]
    pub disable_indexing: bool,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w = w.parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h = h.parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok((w, h))
}

impl Cli {
    /// Build the unified [`RecordingConfig`] all subsystems consume.
    pub fn into_recording_config(self, data_dir: PathBuf) -> RecordingConfig {
        let output_root = self
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("videos"));

        RecordingConfig {
            data_dir,
            output_root,
            segment_seconds: self.segment_seconds,
            target_resolution: self.resolution,
            ffmpeg_path: self.ffmpeg_path,
            idle_threshold: self.idle_threshold,
            maintenance_cooldown: chrono::Duration::hours(
                self.maintenance_cooldown_hours as i64,
            ),
            enable_indexing: !self.disable_indexing,
            debug: self.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1600x900"), Ok((1600, 900)));
        assert_eq!(parse_resolution("1920X1080"), Ok((1920, 1080)));
        assert!(parse_resolution("1600").is_err());
        assert!(parse_resolution("ax900").is_err());
    }

    #[test]
    fn test_config_paths_derive_from_data_dir() {
        let cli = Cli::parse_from(["rewinder", "--data-dir", "/tmp/rw"]);
        let config = cli.into_recording_config(PathBuf::from("/tmp/rw"));
        assert_eq!(
            config.liveness_marker_path(),
            PathBuf::from("/tmp/rw/record.lock")
        );
        assert_eq!(
            config.maintenance_marker_path(),
            PathBuf::from("/tmp/rw/last_idle_maintain")
        );
        assert_eq!(config.output_root, PathBuf::from("/tmp/rw/videos"));
    }
}
