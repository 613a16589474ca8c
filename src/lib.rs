pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod idle;
pub mod maintenance;
pub mod recorder;
pub mod scheduler;
pub mod session;
pub mod supervisor;

pub use cli::Cli;
pub use config::RecordingConfig;
pub use error::RewinderError;
pub use guard::SingletonGuard;
pub use idle::{start_change_monitor, ChangeMonitorHandle, StalenessTracker};
pub use maintenance::{LogOnlyMaintenance, MaintenanceGate, MaintenanceRunner};
pub use recorder::{probe_ffmpeg, RecordedSegment, SegmentRecorder, SegmentSource};
pub use scheduler::{IndexSink, LogOnlyIndexSink, RecordingScheduler, SchedulerState};
pub use supervisor::{start_supervisor, WorkerSpec};
