//! Error taxonomy.
//!
//! Two of these are fatal (`StartupConflict`, `EncoderUnavailable`) and only
//! ever surface before any worker task is started. The rest are recoverable:
//! the owning loop logs them and carries on, and anything that actually kills
//! a loop task is picked up by the supervisor's restart check.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewinderError {
    /// The external encoder exited non-zero. The cycle produced no output
    /// file; the scheduler logs and loops again.
    #[error("encoder exited with status {code}: {command}")]
    EncodingFailure { command: String, code: i32 },

    /// Screenshot capture or similarity scoring failed. Resets the staleness
    /// rank; the monitor self-heals on the next tick.
    #[error("screen sampling failed: {0}")]
    SamplingFailure(String),

    /// Another instance already holds the liveness marker.
    #[error("another recorder instance already holds {}", .0.display())]
    StartupConflict(PathBuf),

    /// ffmpeg could not be found or executed on this host.
    #[error("ffmpeg is not available on this host")]
    EncoderUnavailable,
}
