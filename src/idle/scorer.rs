//! Frame similarity scoring.
//!
//! Deterministic, pure, and cheap: mean absolute luma difference over a
//! sparse pixel grid, normalized into [0, 1]. Differently-shaped frames
//! (resolution change, display swap) score 0 — that is a content change.

use super::sampler::Frame;

/// Compare every Nth pixel. A 4k frame still yields ~500k samples at 16,
/// plenty for a coarse "did anything move" signal.
const PIXEL_STRIDE: usize = 16;

/// Similarity of two frames in [0, 1]. 1.0 means identical samples.
pub fn score_similarity(a: &Frame, b: &Frame) -> f64 {
    if a.width != b.width || a.height != b.height {
        return 0.0;
    }

    let len = a.rgba.len().min(b.rgba.len());
    let step = 4 * PIXEL_STRIDE;
    let mut total: u64 = 0;
    let mut count: u64 = 0;

    let mut i = 0;
    while i + 4 <= len {
        total += luma(&a.rgba, i).abs_diff(luma(&b.rgba, i)) as u64;
        count += 1;
        i += step;
    }

    if count == 0 {
        return 1.0;
    }

    1.0 - (total as f64 / count as f64) / 255.0
}

/// Integer Rec. 601 luma from an RGBA pixel starting at `i`.
fn luma(buf: &[u8], i: usize) -> u32 {
    let r = buf[i] as u32;
    let g = buf[i + 1] as u32;
    let b = buf[i + 2] as u32;
    (299 * r + 587 * g + 114 * b) / 1000
}
