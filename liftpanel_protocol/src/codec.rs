// Decoding and encoding of protocol frames.
//
// Decoding is two-stage: parse the payload as JSON, then validate the shape
// field by field. The stages are kept separate so callers can tell a payload
// that isn't JSON at all (`Malformed`) apart from one that is JSON of the
// wrong shape (`UnknownType` / `MissingField` / `UnknownRelay`) — the
// controller logs those classes at different levels.
//
// There is no partial decode: any failure yields no message, and the
// protocol has no error-reply channel, so the caller drops the input and the
// sender observes nothing.
//
// Encoding goes through the serde derives on `ServerMessage`, which pin the
// wire shape (see `message.rs`).

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::message::{ClientMessage, ServerMessage};
use crate::types::RelayId;

/// Reasons an inbound frame can fail to decode. All are non-fatal: the
/// frame is dropped and the connection stays up.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not well-formed JSON.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The `type` field names no known message.
    #[error("unknown message type '{0}'")]
    UnknownType(String),
    /// A required field is absent or of the wrong kind.
    #[error("missing or invalid field '{0}'")]
    MissingField(&'static str),
    /// The `relay` field names none of the six known relays.
    #[error("unknown relay '{0}'")]
    UnknownRelay(String),
}

/// Decode one inbound frame into a `ClientMessage`.
///
/// String matching on the `type` and `relay` fields happens here, once, at
/// the protocol boundary — everything past this point works with the closed
/// enums.
pub fn decode(bytes: &[u8]) -> Result<ClientMessage, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("type"))?;
    if kind != "set_relay" {
        return Err(DecodeError::UnknownType(kind.to_owned()));
    }

    let relay_name = value
        .get("relay")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("relay"))?;
    let relay = RelayId::from_name(relay_name)
        .ok_or_else(|| DecodeError::UnknownRelay(relay_name.to_owned()))?;

    let state = value
        .get("state")
        .and_then(Value::as_bool)
        .ok_or(DecodeError::MissingField("state"))?;

    Ok(ClientMessage::SetRelay { relay, state })
}

/// Encode a full relay-state snapshot as a `relay_state` frame.
///
/// Deterministic for identical input; always carries all keys present in
/// `states` (the relay bank hands over all six, every time).
pub fn encode_snapshot(states: BTreeMap<RelayId, bool>) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&ServerMessage::RelayState { states })
}
