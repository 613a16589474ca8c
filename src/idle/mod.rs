//! Idle detection — screen-content staleness tracking.
//!
//! A background loop screenshots the primary display on a fixed cadence,
//! scores each frame against the previous one, and accumulates a staleness
//! rank that the recording scheduler compares against its pause threshold.
//!
//! # Architecture
//!
//! ```text
//! sampler.rs — grabs one full-desktop frame via xcap
//! scorer.rs  — pure similarity score over two frames
//! monitor.rs — sampling loop: rank accumulation + watch broadcast
//! ```

pub mod monitor;
pub mod sampler;
pub mod scorer;

pub use monitor::{
    sampling_loop, start_change_monitor, ChangeMonitorHandle, StalenessTracker, RANK_DISABLED,
    RANK_STEP, SAMPLE_INTERVAL, SIMILARITY_FLOOR, SKIP_INTERVAL,
};
pub use sampler::{capture_frame, Frame};
pub use scorer::score_similarity;
