// Control dispatcher: the single entry point for inbound frames.
//
// Decode happens here, in the event loop, not in the per-session reader
// threads — a payload that fails to decode must drop only that message
// while the connection stays up (framing and I/O errors are what end a
// connection, and the reader threads handle those).
//
// There is no error-reply channel in the protocol: a rejected command is
// invisible to the sender beyond the absence of a state change. Unknown
// relay names log at debug, everything else at warn, so a chatty legacy
// client does not flood the log at warn level.
//
// The dispatcher is stateless per call; persistent state lives in the
// relay bank and the broadcaster.

use liftpanel_protocol::codec::{DecodeError, decode, encode_snapshot};
use liftpanel_protocol::message::ClientMessage;
use log::{debug, error, info, warn};

use crate::bank::RelayBank;
use crate::gpio::OutputPort;
use crate::session::{Broadcaster, SessionId};

/// Validate and route one inbound frame from `from`: decode, apply the
/// command to the relay bank, and broadcast the resulting snapshot to all
/// sessions. On decode failure the frame is dropped — no state change, no
/// broadcast.
pub fn handle_inbound<P: OutputPort>(
    bank: &mut RelayBank<P>,
    sessions: &mut Broadcaster,
    from: SessionId,
    frame: &[u8],
) {
    let message = match decode(frame) {
        Ok(message) => message,
        Err(err @ DecodeError::UnknownRelay(_)) => {
            debug!("session {from}: dropping command: {err}");
            return;
        }
        Err(err) => {
            warn!("session {from}: dropping frame: {err}");
            return;
        }
    };

    match message {
        ClientMessage::SetRelay { relay, state } => {
            let new_state = bank.set(relay, state);
            info!(
                "session {from}: {} switched {}",
                relay.name(),
                if new_state { "on" } else { "off" }
            );
            match encode_snapshot(bank.snapshot()) {
                Ok(payload) => sessions.broadcast(&payload),
                Err(e) => error!("failed to encode state snapshot: {e}"),
            }
        }
    }
}
