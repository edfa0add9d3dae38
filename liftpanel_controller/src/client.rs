// TCP client for driving a relay controller.
//
// Provides a non-blocking interface for a supervisor process to command
// the panel. Architecture:
// - `connect()` performs the TCP connect and reads the controller's initial
//   state-sync frame on the calling thread, then spawns a background reader
//   thread.
// - The reader thread calls `read_message()` in a loop, deserializes
//   `ServerMessage`, and pushes into an `mpsc` channel.
// - The caller holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox non-blocking, folding every snapshot into the
//   client's last-known state view.
//
// This separation ensures the calling thread never blocks on network I/O
// after connect. The reader thread handles the blocking reads, and the
// writer flushes synchronously (acceptable for the small frames we send).
//
// Deliberately command-level only: door/floor sequencing (pulse a relay,
// wait, release) belongs to the supervisor driving this client, not here.

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use liftpanel_protocol::framing::{read_message, write_message};
use liftpanel_protocol::message::{ClientMessage, ServerMessage};
use liftpanel_protocol::types::RelayId;

/// Read timeout while waiting for the connect-time state sync.
const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP client for controller communication.
pub struct PanelClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    states: BTreeMap<RelayId, bool>,
}

impl PanelClient {
    /// Connect to a controller and wait for the initial `relay_state`
    /// sync frame, then spawn a reader thread. On return, `states()`
    /// already matches the controller's view.
    pub fn connect(addr: &str) -> Result<Self, String> {
        let stream = TcpStream::connect(addr).map_err(|e| format!("connect failed: {e}"))?;

        // Time-bound the initial sync read; a healthy controller sends it
        // immediately on accept.
        stream.set_read_timeout(Some(SYNC_TIMEOUT)).ok();

        let reader_stream = stream
            .try_clone()
            .map_err(|e| format!("clone failed: {e}"))?;
        let writer = BufWriter::new(stream);

        let mut reader = BufReader::new(reader_stream);
        let sync_bytes =
            read_message(&mut reader).map_err(|e| format!("read state sync failed: {e}"))?;
        let sync: ServerMessage = serde_json::from_slice(&sync_bytes)
            .map_err(|e| format!("parse state sync failed: {e}"))?;
        let ServerMessage::RelayState { states } = sync;

        // Clear the read timeout for the long-lived reader loop.
        if let Ok(inner) = reader.get_ref().try_clone() {
            inner.set_read_timeout(None).ok();
        }

        // Spawn reader thread.
        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok(Self {
            writer,
            inbox: rx,
            _reader_thread: Some(reader_thread),
            states,
        })
    }

    /// Command one relay on or off. The new state arrives via the next
    /// broadcast snapshot, not as a direct reply.
    pub fn set_relay(&mut self, relay: RelayId, state: bool) -> Result<(), String> {
        let msg = ClientMessage::SetRelay { relay, state };
        let json = serde_json::to_vec(&msg).map_err(|e| e.to_string())?;
        write_message(&mut self.writer, &json).map_err(|e| format!("send SetRelay failed: {e}"))
    }

    /// Drain all queued server messages (non-blocking), folding each
    /// snapshot into the last-known state view.
    pub fn poll(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            let ServerMessage::RelayState { states } = &msg;
            self.states = states.clone();
            messages.push(msg);
        }
        messages
    }

    /// Last-known relay states, as of the most recent `poll()`.
    pub fn states(&self) -> &BTreeMap<RelayId, bool> {
        &self.states
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(bytes) = read_message(&mut reader) {
        match serde_json::from_slice::<ServerMessage>(&bytes) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Client dropped the receiver
                }
            }
            Err(_) => break, // Malformed message
        }
    }
}
