//! Full-desktop screenshot capture.

use chrono::{DateTime, Local};
use xcap::Monitor;

use crate::error::RewinderError;

/// One captured frame. Raw RGBA bytes, row-major.
#[derive(Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub captured_at: DateTime<Local>,
}

/// Capture one frame from the primary display (xcap lists it first).
/// Blocking — call from `spawn_blocking`.
pub fn capture_frame() -> Result<Frame, RewinderError> {
    let monitors =
        Monitor::all().map_err(|e| RewinderError::SamplingFailure(e.to_string()))?;

    let monitor = monitors
        .first()
        .ok_or_else(|| RewinderError::SamplingFailure("no displays found".into()))?;

    let image = monitor
        .capture_image()
        .map_err(|e| RewinderError::SamplingFailure(e.to_string()))?;

    Ok(Frame {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
        captured_at: Local::now(),
    })
}
