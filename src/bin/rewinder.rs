use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use dirs::home_dir;
use tokio::signal;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use rewinder::idle::{sampling_loop, start_change_monitor};
use rewinder::maintenance::{spawn_startup_recovery, LogOnlyMaintenance, MaintenanceGate};
use rewinder::scheduler::{IndexSink, LogOnlyIndexSink, RecordingScheduler};
use rewinder::supervisor::{start_supervisor, WorkerSpec};
use rewinder::{
    probe_ffmpeg, Cli, MaintenanceRunner, RecordingConfig, RewinderError, SingletonGuard,
};

const DISPLAY: &str = r"
                    _           __
   ________ _      (_)___  ____/ ___  _____
  / ___/ _ | | /| / / __ \/ __  / _ \/ ___/
 / /  /  __| |/ |/ / / / / /_/ /  __/ /
/_/   \___/|__/|__/_/ /_/\__,_/\___/_/

";

fn get_base_dir(custom_path: &Option<String>) -> anyhow::Result<PathBuf> {
    let default_path = home_dir()
        .ok_or_else(|| anyhow::anyhow!("failed to get home directory"))?
        .join(".rewinder");

    let base_dir = custom_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or(default_path);

    std::fs::create_dir_all(&base_dir)?;
    Ok(base_dir)
}

fn setup_logging(config: &RecordingConfig) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(config.log_dir())?;
    let file_appender = tracing_appender::rolling::daily(config.log_dir(), "rewinder.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let make_env_filter = |debug: bool| {
        let filter = EnvFilter::from_default_env().add_directive("info".parse().unwrap());
        if debug {
            filter.add_directive("rewinder=debug".parse().unwrap())
        } else {
            filter
        }
    };

    let timer = fmt::time::ChronoLocal::new("%Y-%m-%dT%H:%M:%S%.6f".to_string());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_timer(timer.clone())
                .with_filter(make_env_filter(config.debug)),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_timer(timer)
                .with_filter(make_env_filter(config.debug)),
        )
        .init();

    Ok(guard)
}

fn print_settings(config: &RecordingConfig) {
    println!("{}", DISPLAY.truecolor(147, 112, 219).bold());
    println!(
        "{}\n",
        "records your screen, pauses when nothing moves".bright_green()
    );

    println!("┌────────────────────────┬────────────────────────────────────┐");
    println!("│ setting                │ value                              │");
    println!("├────────────────────────┼────────────────────────────────────┤");
    println!(
        "│ data directory         │ {:<34} │",
        config.data_dir.display().to_string()
    );
    println!(
        "│ output root            │ {:<34} │",
        config.output_root.display().to_string()
    );
    println!(
        "│ segment length         │ {:<34} │",
        format!("{} seconds", config.segment_seconds)
    );
    println!(
        "│ idle threshold         │ {:<34} │",
        if config.idle_threshold > 0.0 {
            format!("{}", config.idle_threshold)
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "│ maintenance cooldown   │ {:<34} │",
        format!("{} hours", config.maintenance_cooldown.num_hours())
    );
    println!(
        "│ target resolution      │ {:<34} │",
        config
            .target_resolution
            .map(|(w, h)| format!("{w}x{h}"))
            .unwrap_or_else(|| "native".to_string())
    );
    println!("│ indexing handoff       │ {:<34} │", config.enable_indexing);
    println!("│ debug mode             │ {:<34} │", config.debug);
    println!("└────────────────────────┴────────────────────────────────────┘");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = get_base_dir(&cli.data_dir)?;
    let config = cli.into_recording_config(data_dir);

    let _log_guard = setup_logging(&config)?;
    print_settings(&config);

    // Fatal startup checks, in order: encoder capability, then singleton.
    // Both happen before any worker is started.
    if !probe_ffmpeg(&config.ffmpeg_path).await {
        eprintln!(
            "{}",
            format!(
                "error: {}. please install ffmpeg and make sure it is on PATH.",
                RewinderError::EncoderUnavailable
            )
            .bright_red()
        );
        std::process::exit(1);
    }

    let guard = SingletonGuard::new(config.liveness_marker_path());
    match guard.try_acquire() {
        Ok(true) => debug!("liveness marker acquired"),
        Ok(false) => {
            eprintln!(
                "{}",
                format!(
                    "error: {}",
                    RewinderError::StartupConflict(config.liveness_marker_path())
                )
                .bright_red()
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("failed to probe liveness marker: {e:#}");
            std::process::exit(1);
        }
    }

    let maintenance_runner: Arc<dyn MaintenanceRunner> = Arc::new(LogOnlyMaintenance);

    // One-shot catch-up for anything a previous run left behind. Detached,
    // never restarted.
    spawn_startup_recovery(maintenance_runner.clone());

    let idle_enabled = config.idle_threshold > 0.0;
    let (monitor_handle, rank_tx) = start_change_monitor(idle_enabled);

    let mut workers = Vec::new();

    if let Some(rank_tx) = rank_tx {
        workers.push(WorkerSpec::new("change-monitor", move || {
            let rank_tx = rank_tx.clone();
            tokio::spawn(sampling_loop(rank_tx))
        }));
    } else {
        info!("idle detection disabled, recording continuously");
    }

    let recorder = Arc::new(config.to_segment_recorder());
    let index_sink: Option<Arc<dyn IndexSink>> = config
        .enable_indexing
        .then(|| Arc::new(LogOnlyIndexSink) as Arc<dyn IndexSink>);
    let marker_path = config.maintenance_marker_path();
    let cooldown = config.maintenance_cooldown;
    let idle_threshold = config.idle_threshold;

    workers.push(WorkerSpec::new("recording-scheduler", move || {
        let recorder = recorder.clone();
        let rank_rx = monitor_handle.rank_receiver();
        let index_sink = index_sink.clone();
        let runner = maintenance_runner.clone();
        let marker_path = marker_path.clone();
        tokio::spawn(async move {
            let gate = match MaintenanceGate::load_or_init(marker_path, cooldown, runner) {
                Ok(gate) => gate,
                Err(e) => {
                    error!("failed to load maintenance record: {e:#}");
                    return;
                }
            };
            RecordingScheduler::new(recorder, rank_rx, gate, idle_threshold, index_sink)
                .run()
                .await;
        })
    }));

    let supervisor = start_supervisor(workers);

    tokio::select! {
        _ = supervisor => error!("supervisor ended unexpectedly"),
        _ = signal::ctrl_c() => info!("received ctrl+c, shutting down"),
    }

    Ok(())
}
