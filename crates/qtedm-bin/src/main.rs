//! QtEDM entrypoint: load operator displays and run the PV runtime.

mod memory_tracker;
mod timing;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, trace};
use tracing_appender::non_blocking::WorkerGuard;

use core_audit::AuditLogger;
use core_channels::{ChannelHub, SimHost, CA_POLL_INTERVAL, PVA_POLL_INTERVAL};
use core_events::{
    stats::StatsSnapshot, Event, EventSourceRegistry, TickEventSource, EVENT_CHANNEL_CAP,
};
use core_model::Display;
use core_pv::PvProtocol;
use core_render::UpdateCoordinator;
use core_runtime::{DisplaySession, RuntimeContext};

use crate::timing::StartupTiming;

/// Heartbeat feeding the update coordinator; the coordinator applies
/// its own (adaptive) repaint cadence on top.
const COORDINATOR_HEARTBEAT: Duration = Duration::from_millis(50);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "qtedm", version, about = "Operator display runtime")]
struct Args {
    /// Display files to open (searched on EPICS_DISPLAY_PATH when
    /// given as bare names).
    pub displays: Vec<PathBuf>,
    /// Launch directly into execute mode.
    #[arg(short = 'x', long = "execute")]
    pub execute: bool,
    /// Disable audit logging for this session.
    #[arg(long = "nolog")]
    pub nolog: bool,
}

fn configure_logging() -> Option<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(Path::new("."), "qtedm.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => {
            // A subscriber is already installed (tests); drop the
            // guard so the writer shuts down.
            None
        }
    }
}

/// Colon-separated search path for display files given as bare names.
fn display_search_path() -> Vec<PathBuf> {
    std::env::var("EPICS_DISPLAY_PATH")
        .map(|value| value.split(':').map(PathBuf::from).collect())
        .unwrap_or_default()
}

fn resolve_display(path: &Path, search: &[PathBuf]) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }
    if path.components().count() == 1 {
        for dir in search {
            let candidate = dir.join(path);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

fn load_displays(args: &Args, timing: &StartupTiming) -> Result<Vec<Display>> {
    let search = display_search_path();
    let mut displays = Vec::with_capacity(args.displays.len());
    for requested in &args.displays {
        let path = resolve_display(requested, &search)
            .with_context(|| format!("display file not found: {}", requested.display()))?;
        let loaded_display = core_adl::load_display(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        for problem in loaded_display.validate_geometry() {
            tracing::warn!(target: "startup", %problem, "display geometry");
        }
        info!(target: "startup", file = %path.display(),
            widgets = loaded_display.walk().len(), "display loaded");
        displays.push(loaded_display);
    }
    timing.mark_count("displays loaded", displays.len());
    Ok(displays)
}

fn audit_enabled(args: &Args) -> bool {
    if args.nolog {
        return false;
    }
    !std::env::var("QTEDM_NOLOG")
        .map(|value| value == "1")
        .unwrap_or(false)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _log_guard = configure_logging();
    let timing = StartupTiming::from_env();
    if timing.is_enabled() {
        info!(target: "timing", "startup timing diagnostics enabled");
    }
    timing.mark("logging ready");

    if let Ok(value) = std::env::var("TRACK_MEM") {
        match memory_tracker::parse_track_mem(&value) {
            Some(config) => memory_tracker::spawn(config),
            None => tracing::warn!(target: "startup", value, "unusable TRACK_MEM value"),
        }
    }

    let displays = match load_displays(&args, &timing) {
        Ok(displays) => displays,
        Err(error) => {
            error!(target: "startup", %error, "startup failed");
            eprintln!("qtedm: {error:#}");
            return ExitCode::FAILURE;
        }
    };

    let audit = Arc::new(AuditLogger::new(audit_enabled(&args)));
    info!(target: "startup", audit = audit.is_enabled(), execute = args.execute, "starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!(target: "startup", %error, "tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let host = SimHost::new();
    let hub = ChannelHub::with_sim_host(host, audit);
    let coordinator = Rc::new(RefCell::new(UpdateCoordinator::new()));
    let ctx = RuntimeContext {
        hub: hub.clone(),
        coordinator: coordinator.clone(),
    };

    let mut sessions: Vec<DisplaySession> = Vec::new();
    let mut next_widget_id = 1u64;
    for display in displays {
        hub.set_display_file(Some(display.file_name.clone()));
        let session = DisplaySession::new(display, ctx.clone(), next_widget_id);
        next_widget_id += session.widget_count() as u64 + 1;
        sessions.push(session);
    }
    timing.mark_count("sessions built", sessions.len());

    if !args.execute {
        // Edit mode without a display surface: report and exit.
        for session in &sessions {
            println!(
                "{}: {} widgets, {} channels referenced",
                session.display().file_name,
                session.widget_count(),
                core_model::collect_channels(&session.display().widgets).len()
            );
        }
        return ExitCode::SUCCESS;
    }

    for session in &mut sessions {
        session.set_execute(true);
    }
    timing.mark("execute mode entered");
    hub.reset_update_counters();

    // The runtime loop is a single consumer on this thread; tick
    // sources and the signal watcher live on the worker pool.
    runtime.block_on(async {
        let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
        let mut registry = EventSourceRegistry::new();
        registry.register(TickEventSource::new("ca_poll", CA_POLL_INTERVAL, Event::CaPoll));
        registry.register(TickEventSource::new(
            "pva_poll",
            PVA_POLL_INTERVAL,
            Event::PvaPoll,
        ));
        registry.register(TickEventSource::new(
            "coordinator",
            COORDINATOR_HEARTBEAT,
            Event::CoordinatorTick,
        ));
        let _source_handles = registry.spawn_all(&tx);

        let signal_tx = tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = signal_tx.send(Event::Shutdown).await;
            }
        });
        drop(tx);

        while let Some(event) = rx.recv().await {
            match event {
                Event::CaPoll => hub.dispatch(PvProtocol::Ca, Instant::now()),
                Event::PvaPoll => hub.dispatch(PvProtocol::Pva, Instant::now()),
                Event::CoordinatorTick => {
                    let outcome = coordinator.borrow_mut().tick(Instant::now());
                    if outcome.fired && !outcome.repaint.is_empty() {
                        trace!(target: "render.coordinator",
                            repainted = outcome.repaint.len(),
                            reordered = outcome.reorder.len(),
                            "repaint pass");
                    }
                }
                Event::Shutdown => break,
            }
        }
    });

    info!(target: "runtime", "shutting down");
    for session in sessions.iter_mut().rev() {
        session.set_execute(false);
    }
    let snapshot = StatsSnapshot::capture();
    info!(target: "runtime.stats",
        channels_created = snapshot.channels_created,
        channels_connected = snapshot.channels_connected,
        ca_events = snapshot.ca_events,
        pva_events = snapshot.pva_events,
        updates_executed = snapshot.updates_executed,
        "session statistics");

    ExitCode::SUCCESS
}
