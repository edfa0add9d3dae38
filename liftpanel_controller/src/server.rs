// TCP server and main event loop for the relay controller.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per session): call `framing::read_message()` in
//   a loop and forward the raw frame as `InternalEvent::MessageFrom`. On
//   error/EOF, send `InternalEvent::Disconnected`. Readers do not decode —
//   a frame that fails to decode must drop only that message, so decoding
//   belongs to the dispatcher on the main thread.
// - **Main thread**: owns the `RelayBank` and the `Broadcaster`, receives
//   events from the channel, and services them one at a time to completion.
//   FIFO, no locking, no suspension mid-handler.
//
// The main thread is the only writer to client TCP streams (via
// `Broadcaster`). Reader threads only read from streams. This avoids
// concurrent read/write on the same `TcpStream`, which is safe on most
// platforms but fragile.
//
// Startup gate: `RelayBank::initialize()` runs before the listener is
// spawned. A `HardwareFault` aborts startup — the controller never serves
// with an unverified output configuration.
//
// Shutdown: the main thread checks a `keep_running` flag (set to false by
// `ControllerHandle::stop`) and breaks out of the event loop.

use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use liftpanel_protocol::codec::encode_snapshot;
use liftpanel_protocol::framing::read_message;
use liftpanel_protocol::types::RELAY_COUNT;
use log::{error, info, warn};
use thiserror::Error;

use crate::bank::{DEFAULT_BINDINGS, RelayBank, RelayBinding};
use crate::dispatch::handle_inbound;
use crate::gpio::{HardwareFault, OutputPort};
use crate::session::{Broadcaster, SessionId};

/// Port the original panel hardware listens on.
pub const DEFAULT_PORT: u16 = 81;

/// How often the main loop wakes to check the shutdown flag when no events
/// are arriving.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        session_id: SessionId,
        frame: Vec<u8>,
    },
    Disconnected {
        session_id: SessionId,
    },
}

/// Why the controller failed to start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
    #[error(transparent)]
    Hardware(#[from] HardwareFault),
}

/// Handle returned by `start_controller` to control the running server.
pub struct ControllerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ControllerHandle {
    /// Signal the controller to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a controller.
pub struct ControllerConfig {
    pub port: u16,
    pub bindings: [RelayBinding; RELAY_COUNT],
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bindings: DEFAULT_BINDINGS,
        }
    }
}

/// Initialize the relay bank and start the controller on a background
/// thread. Returns a handle for stopping it and the actual bound address
/// (useful when port 0 is used to let the OS pick a free port).
pub fn start_controller<P: OutputPort + Send + 'static>(
    config: ControllerConfig,
    outputs: P,
) -> Result<(ControllerHandle, std::net::SocketAddr), StartupError> {
    let mut bank = RelayBank::new(config.bindings, outputs);
    bank.initialize()?;

    let listener = TcpListener::bind(("0.0.0.0", config.port))?;
    let addr = listener.local_addr()?;
    info!("controller listening on {addr}");

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || {
        run_controller(listener, bank, keep_running_clone);
    });

    Ok((
        ControllerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main controller loop. Runs until `keep_running` is set to false.
fn run_controller<P: OutputPort>(
    listener: TcpListener,
    mut bank: RelayBank<P>,
    keep_running: Arc<AtomicBool>,
) {
    let mut sessions = Broadcaster::new();

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Set the listener to non-blocking so the accept thread can check
    // keep_running periodically.
    listener.set_nonblocking(true).ok();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }
    });

    // Main event loop.
    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
            Ok(event) => {
                handle_event(&mut bank, &mut sessions, event, &tx, &keep_running);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut bank, &mut sessions, event, &tx, &keep_running);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Dispatch a single event.
fn handle_event<P: OutputPort>(
    bank: &mut RelayBank<P>,
    sessions: &mut Broadcaster,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(bank, sessions, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom { session_id, frame } => {
            handle_inbound(bank, sessions, session_id, &frame);
        }
        InternalEvent::Disconnected { session_id } => {
            sessions.remove_session(session_id);
        }
    }
}

/// Handle a new TCP connection: register the session, unicast a fresh
/// state snapshot to it, and spawn its reader thread. The protocol has no
/// handshake — any connecting client is a session.
fn handle_new_connection<P: OutputPort>(
    bank: &mut RelayBank<P>,
    sessions: &mut Broadcaster,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let read_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!("dropping connection, stream clone failed: {e}");
            return;
        }
    };

    let sync = match encode_snapshot(bank.snapshot()) {
        Ok(payload) => payload,
        Err(e) => {
            error!("failed to encode state snapshot: {e}");
            return;
        }
    };

    let session_id = sessions.add_session(stream, &sync);

    // Spawn a reader thread for this session.
    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(BufReader::new(read_stream), session_id, tx_reader, keep_running_reader);
    });
}

/// Reader loop for a single session. Runs in its own thread and forwards
/// raw frames; decoding happens on the main thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    session_id: SessionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_message(&mut reader) {
            Ok(frame) => {
                let _ = tx.send(InternalEvent::MessageFrom { session_id, frame });
            }
            Err(_) => {
                // Read error or EOF — disconnect.
                let _ = tx.send(InternalEvent::Disconnected { session_id });
                break;
            }
        }
    }
}
