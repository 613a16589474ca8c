//! Change monitor — the staleness-rank sampling loop.
//!
//! Owns the rank and the last-seen frame; nothing else writes them. The
//! scheduler only ever sees consistent snapshots through a
//! `tokio::sync::watch` channel, broadcast once per tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::sampler::{capture_frame, Frame};
use super::scorer::score_similarity;
use crate::session::session_is_capturable;

/// Seconds between samples while the session is capturable.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(30);
/// Shorter poll while the screen is locked or the system is dozing.
pub const SKIP_INTERVAL: Duration = Duration::from_secs(5);
/// Similarity above this counts as "no meaningful change".
pub const SIMILARITY_FLOOR: f64 = 0.9;
/// Rank increment per static sample.
pub const RANK_STEP: f64 = 0.5;
/// Sentinel broadcast when idle detection is disabled. Below any real
/// threshold, so the scheduler always takes the recording branch.
pub const RANK_DISABLED: f64 = -1.0;

/// Staleness rank plus the one prior frame it is scored against.
pub struct StalenessTracker {
    rank: f64,
    last_frame: Option<Frame>,
}

impl Default for StalenessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StalenessTracker {
    pub fn new() -> Self {
        Self {
            rank: 0.0,
            last_frame: None,
        }
    }

    pub fn rank(&self) -> f64 {
        self.rank
    }

    /// Fold one similarity score into the rank.
    pub fn apply_score(&mut self, similarity: f64) {
        if similarity > SIMILARITY_FLOOR {
            self.rank += RANK_STEP;
        } else {
            self.rank = 0.0;
        }
    }

    /// Score `frame` against the previous one and update the rank.
    /// Returns the similarity, or `None` on the first sample after a
    /// start or reset (rank unchanged in that case).
    pub fn observe(&mut self, frame: Frame) -> Option<f64> {
        let similarity = self
            .last_frame
            .as_ref()
            .map(|prev| score_similarity(prev, &frame));
        if let Some(s) = similarity {
            self.apply_score(s);
        }
        self.last_frame = Some(frame);
        similarity
    }

    /// Sampling failure: rank to 0, prior frame dropped so the next
    /// successful sample starts a fresh comparison chain.
    pub fn reset(&mut self) {
        self.rank = 0.0;
        self.last_frame = None;
    }
}

/// Scheduler-side view of the monitor.
#[derive(Clone)]
pub struct ChangeMonitorHandle {
    rank_rx: watch::Receiver<f64>,
}

impl ChangeMonitorHandle {
    pub fn current_rank(&self) -> f64 {
        *self.rank_rx.borrow()
    }

    pub fn rank_receiver(&self) -> watch::Receiver<f64> {
        self.rank_rx.clone()
    }
}

/// Create the monitor handle and the loop factory the supervisor runs.
///
/// When `enabled` is false no loop is needed: the handle permanently
/// reports [`RANK_DISABLED`] and the returned factory is `None`.
pub fn start_change_monitor(
    enabled: bool,
) -> (ChangeMonitorHandle, Option<Arc<watch::Sender<f64>>>) {
    let initial = if enabled { 0.0 } else { RANK_DISABLED };
    let (rank_tx, rank_rx) = watch::channel(initial);
    let handle = ChangeMonitorHandle { rank_rx };
    let sender = enabled.then(|| Arc::new(rank_tx));
    (handle, sender)
}

/// The sampling loop body. Runs forever; every failure is absorbed and
/// reported as a rank reset, so only a panic can end the task — and the
/// supervisor restarts it then.
pub async fn sampling_loop(rank_tx: Arc<watch::Sender<f64>>) {
    let mut tracker = StalenessTracker::new();

    loop {
        if !session_is_capturable().await {
            debug!("screen locked or system asleep, skipping sample");
            tokio::time::sleep(SKIP_INTERVAL).await;
            continue;
        }

        match tokio::task::spawn_blocking(capture_frame).await {
            Ok(Ok(frame)) => {
                let similarity = tracker.observe(frame);
                let _ = rank_tx.send(tracker.rank());
                debug!(
                    rank = tracker.rank(),
                    similarity = ?similarity,
                    "monitor tick"
                );
            }
            Ok(Err(e)) => {
                warn!("sampling failed ({e}), resetting staleness rank");
                tracker.reset();
                let _ = rank_tx.send(0.0);
            }
            Err(e) => {
                warn!("capture task aborted ({e}), resetting staleness rank");
                tracker.reset();
                let _ = rank_tx.send(0.0);
            }
        }

        tokio::time::sleep(SAMPLE_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_accumulates_on_similar_samples() {
        let mut tracker = StalenessTracker::new();
        assert_eq!(tracker.rank(), 0.0);
        tracker.apply_score(0.95);
        assert_eq!(tracker.rank(), 0.5);
        tracker.apply_score(0.99);
        assert_eq!(tracker.rank(), 1.0);
    }

    #[test]
    fn test_rank_resets_on_dissimilar_sample() {
        let mut tracker = StalenessTracker::new();
        tracker.apply_score(0.95);
        tracker.apply_score(0.95);
        assert_eq!(tracker.rank(), 1.0);
        tracker.apply_score(0.9); // not strictly above the floor
        assert_eq!(tracker.rank(), 0.0);
    }

    #[test]
    fn test_rank_resets_on_failure_regardless_of_prior_value() {
        let mut tracker = StalenessTracker::new();
        for _ in 0..20 {
            tracker.apply_score(0.95);
        }
        assert_eq!(tracker.rank(), 10.0);
        tracker.reset();
        assert_eq!(tracker.rank(), 0.0);
    }

    #[test]
    fn test_first_observation_leaves_rank_unchanged() {
        let mut tracker = StalenessTracker::new();
        let frame = Frame {
            width: 4,
            height: 4,
            rgba: vec![7; 64],
            captured_at: chrono::Local::now(),
        };
        assert_eq!(tracker.observe(frame.clone()), None);
        assert_eq!(tracker.rank(), 0.0);
        // Second identical frame scores 1.0 and bumps the rank.
        assert_eq!(tracker.observe(frame), Some(1.0));
        assert_eq!(tracker.rank(), 0.5);
    }

    #[test]
    fn test_reset_also_drops_comparison_chain() {
        let mut tracker = StalenessTracker::new();
        let frame = Frame {
            width: 4,
            height: 4,
            rgba: vec![7; 64],
            captured_at: chrono::Local::now(),
        };
        tracker.observe(frame.clone());
        tracker.observe(frame.clone());
        assert_eq!(tracker.rank(), 0.5);
        tracker.reset();
        // Next sample is a "first" sample again: no similarity, no bump.
        assert_eq!(tracker.observe(frame), None);
        assert_eq!(tracker.rank(), 0.0);
    }

    #[test]
    fn test_disabled_monitor_reports_sentinel() {
        let (handle, sender) = start_change_monitor(false);
        assert!(sender.is_none());
        assert_eq!(handle.current_rank(), RANK_DISABLED);
    }

    #[test]
    fn test_enabled_monitor_starts_at_zero() {
        let (handle, sender) = start_change_monitor(true);
        assert!(sender.is_some());
        assert_eq!(handle.current_rank(), 0.0);
        sender.unwrap().send(1.5).unwrap();
        assert_eq!(handle.current_rank(), 1.5);
    }
}
