//! Linebot pilot
//!
//! Wires the perception-and-control core into a running process:
//! - capture thread: synthetic camera (or a real driver behind the same
//!   callback) feeding the frame pipeline at the source cadence
//! - broadcast worker: owned by `viewer-broadcast`
//! - LED thread: fixed-delay pattern renderer on the shared state
//! - shell thread: blocking line commands from stdin
//! - journal thread: collects control records, writes CSV on shutdown

pub mod config;
pub mod journal;
pub mod led;
pub mod pipeline;
pub mod shell;
pub mod sim;

pub use config::{AppConfig, BandConfig, ConfigStore};
pub use pipeline::FramePipeline;

// The config module and the config crate share a name; the error variant
// below wraps the crate's type.
use ::config::ConfigError;
use frame_capture::{Frame, FrameError, FrameSink};
use line_vision::LineSegmenter;
use navigation::{NavigationError, NavigationHandle, NavigationMachine};
use shell::ShellContext;
use sim::{SimIndicator, SimMotors, SimSensors, SyntheticCamera};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use viewer_broadcast::{BroadcastError, FrameBroadcaster};

/// Pilot error types
#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Signal handler setup failed: {0}")]
    Signal(String),
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the pilot until `exit` or SIGINT
pub fn run(config_path: Option<PathBuf>) -> Result<(), PilotError> {
    let app_config = AppConfig::load(config_path.as_deref())?;
    info!(
        width = app_config.capture.width,
        height = app_config.capture.height,
        fps = app_config.capture.fps,
        "pilot starting"
    );

    let store = Arc::new(ConfigStore::new(app_config.clone(), config_path));
    let handle = NavigationHandle::new();
    let motors = Arc::new(Mutex::new(SimMotors::default()));
    let indicator = Arc::new(Mutex::new(SimIndicator::default()));
    let running = Arc::new(AtomicBool::new(true));

    let (log_tx, log_rx) = mpsc::channel();
    let machine = NavigationMachine::new(
        app_config.navigation.clone(),
        handle.clone(),
        Arc::clone(&motors),
        SimSensors::default(),
        Arc::clone(&indicator),
    )
    .with_log_channel(log_tx);

    let frame = Arc::new(Mutex::new(Frame::new(
        app_config.capture.width,
        app_config.capture.height,
    )));
    let frame_len = (app_config.capture.width * app_config.capture.height) as usize;
    let broadcaster = FrameBroadcaster::start(&app_config.broadcast, frame_len)?;

    let mut pipeline = FramePipeline::new(
        Arc::clone(&frame),
        LineSegmenter::new(&app_config.segmenter),
        machine,
        handle.clone(),
        broadcaster,
        app_config.bands.clone(),
        app_config.broadcast.frame_divisor,
    );

    // SIGINT: brake + force Waiting immediately, then wind down cooperatively
    {
        let handle = handle.clone();
        let motors = Arc::clone(&motors);
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            warn!("interrupt: braking");
            if let Err(e) = handle.stop_with(&motors) {
                warn!(error = %e, "interrupt stop failed");
            }
            running.store(false, Ordering::SeqCst);
        })
        .map_err(|e| PilotError::Signal(e.to_string()))?;
    }

    let capture_thread = thread::Builder::new().name("capture".to_string()).spawn({
        let running = Arc::clone(&running);
        let capture_config = app_config.capture.clone();
        move || {
            let mut camera = SyntheticCamera::new(&capture_config);
            let interval = Duration::from_secs_f64(1.0 / capture_config.fps.max(1) as f64);
            while running.load(Ordering::SeqCst) {
                pipeline.on_frame(camera.next_frame());
                thread::sleep(interval);
            }
        }
    })?;

    let led_thread = thread::Builder::new().name("led".to_string()).spawn({
        let indicator = Arc::clone(&indicator);
        let handle = handle.clone();
        let running = Arc::clone(&running);
        move || led::run(indicator, handle, running)
    })?;

    let journal_thread = thread::Builder::new().name("journal".to_string()).spawn({
        let log_path = PathBuf::from(&app_config.log_path);
        move || journal::collect_and_persist(log_rx, &log_path)
    })?;

    // The shell owns stdin. It cannot be interrupted portably, so it is not
    // joined; it dies with the process after the run flag clears.
    let _shell_thread = thread::Builder::new().name("shell".to_string()).spawn({
        let ctx = ShellContext {
            handle: handle.clone(),
            motors: Arc::clone(&motors),
            frame: Arc::clone(&frame),
            config: Arc::clone(&store),
            running: Arc::clone(&running),
        };
        move || {
            let stdin = std::io::stdin();
            shell::run(&ctx, stdin.lock());
        }
    })?;

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    // Capture exits first, dropping the pipeline (and with it the broadcaster
    // and the journal sender), which lets the journal flush its CSV.
    capture_thread
        .join()
        .map_err(|_| PilotError::Io(thread_panic("capture")))?;
    led_thread
        .join()
        .map_err(|_| PilotError::Io(thread_panic("led")))?;
    journal_thread
        .join()
        .map_err(|_| PilotError::Io(thread_panic("journal")))?;

    info!("pilot stopped");
    Ok(())
}

fn thread_panic(name: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("{name} thread panicked"),
    )
}
