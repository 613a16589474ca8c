//! Idle maintenance gate.
//!
//! Housekeeping (pruning, index catch-up — whatever the configured runner
//! does) may only start after a cooldown since the last approved run. The
//! last-approved timestamp is a plain-text file so it survives restarts.
//!
//! The gate is deliberately best-effort: the timestamp is advanced when a
//! run is *approved*, not when it completes. Rapid restarts can in theory
//! overlap two runs; runners must tolerate that.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

/// On-disk timestamp format of the maintenance marker.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// External maintenance collaborator.
#[async_trait]
pub trait MaintenanceRunner: Send + Sync {
    /// The idle-triggered housekeeping pass.
    async fn run_idle_maintenance(&self) -> Result<()>;

    /// One-shot catch-up at startup (e.g. files left over by a previous
    /// crash). Spawned detached, never restarted.
    async fn startup_recovery(&self) -> Result<()>;
}

/// Default runner: announces itself and does nothing. Real housekeeping is
/// a separate collaborator wired in by the embedding application.
pub struct LogOnlyMaintenance;

#[async_trait]
impl MaintenanceRunner for LogOnlyMaintenance {
    async fn run_idle_maintenance(&self) -> Result<()> {
        info!("idle maintenance window opened (no maintenance tasks configured)");
        Ok(())
    }

    async fn startup_recovery(&self) -> Result<()> {
        info!("startup recovery pass (no maintenance tasks configured)");
        Ok(())
    }
}

/// Cooldown gate over the maintenance runner.
pub struct MaintenanceGate {
    marker_path: PathBuf,
    cooldown: chrono::Duration,
    last_run: NaiveDateTime,
    runner: Arc<dyn MaintenanceRunner>,
}

impl MaintenanceGate {
    /// Read the persisted timestamp, or initialize it to now on first run
    /// (or an unreadable marker) so a cold start does not immediately
    /// trigger maintenance.
    pub fn load_or_init(
        marker_path: PathBuf,
        cooldown: chrono::Duration,
        runner: Arc<dyn MaintenanceRunner>,
    ) -> Result<Self> {
        let last_run = match std::fs::read_to_string(&marker_path) {
            Ok(text) => match NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(
                        "unparseable maintenance marker {} ({e}), reinitializing",
                        marker_path.display()
                    );
                    Self::write_marker(&marker_path, Local::now().naive_local())?
                }
            },
            Err(_) => Self::write_marker(&marker_path, Local::now().naive_local())?,
        };

        Ok(Self {
            marker_path,
            cooldown,
            last_run,
            runner,
        })
    }

    fn write_marker(path: &std::path::Path, ts: NaiveDateTime) -> Result<NaiveDateTime> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, ts.format(TIMESTAMP_FORMAT).to_string())
            .with_context(|| format!("failed to write maintenance marker {}", path.display()))?;
        Ok(ts)
    }

    pub fn last_run(&self) -> NaiveDateTime {
        self.last_run
    }

    /// Approve and start a maintenance handoff iff the cooldown has elapsed.
    ///
    /// The timestamp is persisted *before* the detached handoff so that the
    /// many idle-wait iterations of a long idle period do not each approve a
    /// run. Returns true iff a handoff was started.
    pub fn maybe_run(&mut self, now: NaiveDateTime) -> bool {
        if now - self.last_run <= self.cooldown {
            return false;
        }

        self.last_run = now;
        if let Err(e) = Self::write_marker(&self.marker_path, now) {
            warn!("failed to persist maintenance timestamp: {e:#}");
        }

        info!("idle maintenance approved, handing off");
        let runner = self.runner.clone();
        tokio::spawn(async move {
            // Detached: a failing maintenance run must never touch the
            // scheduler loop's liveness.
            if let Err(e) = runner.run_idle_maintenance().await {
                warn!("idle maintenance failed: {e:#}");
            }
        });

        true
    }
}

/// Fire the one-shot startup catch-up task, detached.
pub fn spawn_startup_recovery(runner: Arc<dyn MaintenanceRunner>) {
    tokio::spawn(async move {
        if let Err(e) = runner.startup_recovery().await {
            warn!("startup recovery failed: {e:#}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};

    fn gate_at(dir: &std::path::Path, cooldown_hours: i64) -> MaintenanceGate {
        MaintenanceGate::load_or_init(
            dir.join("last_idle_maintain"),
            Duration::hours(cooldown_hours),
            Arc::new(LogOnlyMaintenance),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_cold_start_initializes_marker_to_now() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate_at(dir.path(), 8);
        assert!(dir.path().join("last_idle_maintain").exists());
        // Freshly initialized: nothing to do yet.
        assert!(!gate.maybe_run(Local::now().naive_local()));
    }

    #[tokio::test]
    async fn test_approval_after_cooldown_and_refusal_within() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate_at(dir.path(), 8);

        let now = gate.last_run();
        assert!(!gate.maybe_run(now + Duration::hours(7)));
        assert!(gate.maybe_run(now + Duration::hours(9)));
        // Immediately after a true-returning call the gate is closed again.
        assert!(!gate.maybe_run(now + Duration::hours(9) + Duration::minutes(1)));
        assert!(gate.maybe_run(now + Duration::hours(18)));
    }

    #[tokio::test]
    async fn test_timestamp_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate_at(dir.path(), 8);
        let now = gate.last_run();
        assert!(gate.maybe_run(now + Duration::hours(9)));

        // Simulated restart: reload from disk.
        let mut reloaded = gate_at(dir.path(), 8);
        assert_eq!(
            reloaded.last_run(),
            // Stored at second precision.
            (now + Duration::hours(9)).with_nanosecond(0).unwrap()
        );
        assert!(!reloaded.maybe_run(now + Duration::hours(10)));
        assert!(reloaded.maybe_run(now + Duration::hours(18)));
    }

    #[tokio::test]
    async fn test_garbage_marker_reinitializes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("last_idle_maintain"), "not a timestamp").unwrap();
        let mut gate = gate_at(dir.path(), 8);
        assert!(!gate.maybe_run(Local::now().naive_local()));
    }
}
