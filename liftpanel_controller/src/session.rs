// Session tracking and state fan-out.
//
// `Broadcaster` owns the set of connected client sessions — the write
// halves of their TCP streams, keyed by `SessionId`. All mutation happens
// through methods called from the server's single-threaded event loop, so
// there is no internal locking, and the event loop is the only writer to
// client streams (reader threads only read).
//
// Delivery is best-effort per session: a write error is logged at debug
// level and otherwise ignored. The failed session's reader thread notices
// the broken pipe and reports a disconnect, which removes the session. A
// failure to one session never blocks or fails delivery to the others.
//
// The payloads passed in are already-encoded frames (see
// `liftpanel_protocol::codec`); the broadcaster frames and writes them.
// Broadcasts hand the same bytes to every session.

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufWriter;
use std::net::TcpStream;

use liftpanel_protocol::framing::write_message;
use log::{debug, info};

/// Opaque handle for one connected client, assigned at accept time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks connected sessions and fans state frames out to them.
#[derive(Default)]
pub struct Broadcaster {
    sessions: BTreeMap<SessionId, BufWriter<TcpStream>>,
    next_session_id: u32,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected client and unicast `sync` to it, so its
    /// view matches current relay state before any later broadcast reaches
    /// it. Returns the assigned session id.
    pub fn add_session(&mut self, stream: TcpStream, sync: &[u8]) -> SessionId {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        let mut writer = BufWriter::new(stream);
        if let Err(e) = write_message(&mut writer, sync) {
            debug!("state sync to session {id} failed: {e}");
        }
        self.sessions.insert(id, writer);
        info!("session {id} connected ({} active)", self.sessions.len());
        id
    }

    /// Deregister a session. Nothing further is sent to it; safe to call
    /// after a send to the same session has already failed.
    pub fn remove_session(&mut self, id: SessionId) {
        if self.sessions.remove(&id).is_some() {
            info!("session {id} disconnected ({} active)", self.sessions.len());
        }
    }

    /// Send one frame to one session. Best-effort.
    pub fn send_to(&mut self, id: SessionId, payload: &[u8]) {
        if let Some(writer) = self.sessions.get_mut(&id) {
            if let Err(e) = write_message(writer, payload) {
                debug!("send to session {id} failed: {e}");
            }
        }
    }

    /// Send the same frame to every registered session. Delivery order
    /// across sessions is unspecified; an error on one session does not
    /// affect the others.
    pub fn broadcast(&mut self, payload: &[u8]) {
        for (id, writer) in &mut self.sessions {
            if let Err(e) = write_message(writer, payload) {
                debug!("broadcast to session {id} failed: {e}");
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
