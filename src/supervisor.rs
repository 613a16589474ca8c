//! Supervisor — restart-on-death for the long-lived loops.
//!
//! The change monitor and the recording scheduler are supposed to run
//! forever; if one ends, something panicked. The supervisor polls its
//! registry and replaces any finished handle with a fresh task from the
//! same factory. Restart is unconditional and unlimited — a transient
//! failure in either loop shows up as nothing worse than a short gap.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Registry poll interval.
pub const SUPERVISOR_INTERVAL: Duration = Duration::from_secs(30);

/// A named long-lived task plus the factory that (re)creates it.
pub struct WorkerSpec {
    pub name: &'static str,
    factory: Box<dyn Fn() -> JoinHandle<()> + Send>,
}

impl WorkerSpec {
    pub fn new(
        name: &'static str,
        factory: impl Fn() -> JoinHandle<()> + Send + 'static,
    ) -> Self {
        Self {
            name,
            factory: Box::new(factory),
        }
    }
}

/// Start every worker, then poll their liveness forever.
pub fn start_supervisor(specs: Vec<WorkerSpec>) -> JoinHandle<()> {
    start_supervisor_with_interval(specs, SUPERVISOR_INTERVAL)
}

pub fn start_supervisor_with_interval(
    specs: Vec<WorkerSpec>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut workers: Vec<(WorkerSpec, JoinHandle<()>)> = specs
            .into_iter()
            .map(|spec| {
                info!("supervisor starting worker '{}'", spec.name);
                let handle = (spec.factory)();
                (spec, handle)
            })
            .collect();

        loop {
            tokio::time::sleep(interval).await;

            for (spec, handle) in workers.iter_mut() {
                if handle.is_finished() {
                    warn!("worker '{}' exited unexpectedly, restarting", spec.name);
                    *handle = (spec.factory)();
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_dead_worker_is_restarted() {
        let starts = Arc::new(AtomicUsize::new(0));
        let starts_clone = starts.clone();

        let spec = WorkerSpec::new("flaky", move || {
            let starts = starts_clone.clone();
            tokio::spawn(async move {
                starts.fetch_add(1, Ordering::SeqCst);
                // Exits immediately — simulates a crashed loop.
            })
        });

        let supervisor = start_supervisor_with_interval(vec![spec], Duration::from_secs(1));

        // Let several poll cycles elapse.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(
            starts.load(Ordering::SeqCst) >= 3,
            "expected repeated restarts, got {}",
            starts.load(Ordering::SeqCst)
        );

        supervisor.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_worker_is_left_alone() {
        let starts = Arc::new(AtomicUsize::new(0));
        let starts_clone = starts.clone();

        let spec = WorkerSpec::new("steady", move || {
            let starts = starts_clone.clone();
            tokio::spawn(async move {
                starts.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<()>().await;
            })
        });

        let supervisor = start_supervisor_with_interval(vec![spec], Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        supervisor.abort();
    }
}
