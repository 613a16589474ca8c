//! Recording scheduler — the top-level state machine.
//!
//! Two states, no terminal state:
//!
//! ```text
//! RECORDING  — run one segment to completion, hand off indexing, re-evaluate
//! IDLE_WAIT  — wait, check the maintenance gate, re-evaluate
//! ```
//!
//! The transition input is the staleness rank published by the change
//! monitor. Segments are strictly sequential: a new encoder invocation can
//! only start after the previous call returned, so no two output files share
//! a time range.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::maintenance::MaintenanceGate;
use crate::recorder::{RecordedSegment, SegmentSource};

/// Wait between idle re-evaluations.
pub const IDLE_WAIT: Duration = Duration::from_secs(10);
/// Pause after a finished segment before the next evaluation.
pub const POST_SEGMENT_BREATHER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Recording,
    IdleWait,
}

/// Downstream consumer of finalized segments (OCR indexing, etc.).
/// Invoked on a detached task; failures are logged and isolated.
#[async_trait]
pub trait IndexSink: Send + Sync {
    async fn index_segment(&self, dir: &Path, file_name: &str) -> anyhow::Result<()>;
}

/// Default sink: records the handoff in the log and stops there. OCR/video
/// indexing proper is a separate collaborator.
pub struct LogOnlyIndexSink;

#[async_trait]
impl IndexSink for LogOnlyIndexSink {
    async fn index_segment(&self, dir: &Path, file_name: &str) -> anyhow::Result<()> {
        info!(
            "segment ready for indexing: {} (no index backend configured)",
            dir.join(file_name).display()
        );
        Ok(())
    }
}

pub struct RecordingScheduler<S: SegmentSource> {
    source: Arc<S>,
    rank_rx: watch::Receiver<f64>,
    gate: MaintenanceGate,
    idle_threshold: f64,
    index_sink: Option<Arc<dyn IndexSink>>,
    state: SchedulerState,
}

impl<S: SegmentSource + 'static> RecordingScheduler<S> {
    pub fn new(
        source: Arc<S>,
        rank_rx: watch::Receiver<f64>,
        gate: MaintenanceGate,
        idle_threshold: f64,
        index_sink: Option<Arc<dyn IndexSink>>,
    ) -> Self {
        Self {
            source,
            rank_rx,
            gate,
            idle_threshold,
            index_sink,
            // Initial state: record first, pause only once staleness is seen.
            state: SchedulerState::Recording,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Pick the next state from the current rank snapshot.
    ///
    /// Threshold 0 disables the idle branch outright; a disabled monitor
    /// reports a negative sentinel rank, which no positive threshold
    /// comparison ever passes.
    fn evaluate(&self) -> SchedulerState {
        let rank = *self.rank_rx.borrow();
        if self.idle_threshold > 0.0 && rank > self.idle_threshold {
            SchedulerState::IdleWait
        } else {
            SchedulerState::Recording
        }
    }

    fn announce(&self, next: SchedulerState) {
        // Liveness/UX signal only; one distinct line per state.
        match next {
            SchedulerState::Recording => info!("screen content changing, recording"),
            SchedulerState::IdleWait => info!("screen content static, recording paused"),
        }
    }

    /// One scheduler iteration. Split out from [`run`] so tests can drive
    /// the machine tick by tick.
    pub async fn tick(&mut self) {
        let next = self.evaluate();
        if next != self.state {
            self.announce(next);
            self.state = next;
        }

        match self.state {
            SchedulerState::IdleWait => {
                self.gate.maybe_run(Local::now().naive_local());
                tokio::time::sleep(IDLE_WAIT).await;
            }
            SchedulerState::Recording => {
                match self.source.record().await {
                    Ok(segment) => self.hand_off_indexing(segment),
                    Err(e) => {
                        // Recoverable: no output file this cycle, loop on.
                        warn!("segment recording failed, skipping cycle: {e:#}");
                    }
                }
                tokio::time::sleep(POST_SEGMENT_BREATHER).await;
            }
        }
    }

    /// Detached handoff. The output file is already finalized — `record`
    /// only returns after the encoder exits — and the sink is never awaited
    /// by this loop, so its failures cannot affect scheduling.
    fn hand_off_indexing(&self, segment: RecordedSegment) {
        let Some(sink) = self.index_sink.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = sink.index_segment(&segment.dir, &segment.file_name).await {
                warn!(
                    "indexing handoff failed for {}: {e:#}",
                    segment.path().display()
                );
            }
        });
    }

    /// Supervised infinite loop. Ends only by process shutdown or a panic,
    /// which the supervisor answers with a restart.
    pub async fn run(mut self) {
        loop {
            self.tick().await;
        }
    }
}
