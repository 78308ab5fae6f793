//! Single-slot mailbox and TCP worker

use crate::packet::ViewerPacket;
use crate::{BroadcastConfig, BroadcastError};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

struct Slot {
    packet: ViewerPacket,
    ready: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    ready_cv: Condvar,
    running: AtomicBool,
    dropped: AtomicU64,
}

/// Best-effort frame broadcaster.
///
/// `publish` is called from the capture thread and must never block: it takes
/// the slot with `try_lock` and drops the frame when the worker is busy
/// sending. The worker owns the listener and serves one client at a time;
/// a dead client costs one log line and a re-accept, nothing more. A lost
/// connection surfaces as an `io::Error` from the write (the runtime masks
/// SIGPIPE), so it can never take the process down.
pub struct FrameBroadcaster {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    port: u16,
}

impl FrameBroadcaster {
    /// Bind the listener and start the worker. A bind failure is a startup
    /// error; the caller aborts before the control loop begins.
    pub fn start(config: &BroadcastConfig, frame_len: usize) -> Result<Self, BroadcastError> {
        let listener = TcpListener::bind(("0.0.0.0", config.port))?;
        let port = listener.local_addr()?.port();

        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                packet: ViewerPacket::sized(frame_len),
                ready: false,
            }),
            ready_cv: Condvar::new(),
            running: AtomicBool::new(true),
            dropped: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("viewer-broadcast".to_string())
            .spawn(move || worker_loop(listener, worker_shared))
            .map_err(|e| BroadcastError::Spawn(e.to_string()))?;

        info!(port, "viewer broadcast listening");
        Ok(Self {
            shared,
            worker: Some(worker),
            port,
        })
    }

    /// The port actually bound (differs from the config when it asked for 0)
    pub fn local_port(&self) -> u16 {
        self.port
    }

    /// Offer a packet to the worker. Returns false when the slot was busy
    /// and the frame was dropped.
    pub fn publish(&self, packet: &ViewerPacket) -> bool {
        let Ok(mut slot) = self.shared.slot.try_lock() else {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("viewer slot busy; frame dropped");
            return false;
        };
        slot.packet.clone_from_packet(packet);
        slot.ready = true;
        self.shared.ready_cv.notify_one();
        true
    }

    /// Frames dropped because the slot was busy
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Stop the worker and join it
    pub fn shutdown(&mut self) {
        if self.worker.is_none() {
            return;
        }
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.ready_cv.notify_all();
        // unblock a pending accept
        let _ = TcpStream::connect(("127.0.0.1", self.port));
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for FrameBroadcaster {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(listener: TcpListener, shared: Arc<Shared>) {
    while shared.running.load(Ordering::SeqCst) {
        info!("waiting for viewer connection");
        let (stream, peer) = match listener.accept() {
            Ok(conn) => conn,
            Err(e) => {
                if !shared.running.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }
        info!(%peer, "viewer connected");
        serve_client(stream, &shared);
    }
    info!("broadcast worker exiting");
}

/// Send slot contents to one client until the connection breaks or the
/// broadcaster shuts down.
fn serve_client(mut stream: TcpStream, shared: &Shared) {
    let mut wire = Vec::new();
    loop {
        let mut slot = lock_slot(shared);
        while !slot.ready && shared.running.load(Ordering::SeqCst) {
            slot = match shared.ready_cv.wait(slot) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        if !shared.running.load(Ordering::SeqCst) {
            return;
        }
        slot.ready = false;
        slot.packet.encode_into(&mut wire);

        // The slot lock is held across the write; a publish arriving now
        // takes the drop path instead of mutating the packet mid-send.
        if let Err(e) = stream.write_all(&wire) {
            warn!(error = %e, "viewer connection lost");
            return;
        }
    }
}

fn lock_slot(shared: &Shared) -> MutexGuard<'_, Slot> {
    match shared.slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
