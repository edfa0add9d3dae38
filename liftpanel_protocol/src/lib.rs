// liftpanel_protocol — wire protocol for the liftpanel relay controller.
//
// This crate defines the message types, framing, and codec used by the
// controller (`liftpanel_controller`) and panel clients to communicate over
// TCP. It is shared between both sides and has no dependency on the GPIO or
// server crates.
//
// Module overview:
// - `types.rs`:   `RelayId` — the closed set of six logical relays and
//                 their wire spellings.
// - `message.rs`: Client-to-controller and controller-to-client message
//                 enums, internally tagged on a `type` field.
// - `codec.rs`:   `decode` with the `DecodeError` taxonomy, plus
//                 `encode_snapshot` for state fan-out.
// - `framing.rs`: Length-delimited framing over any `Read`/`Write` stream:
//                 4-byte big-endian length prefix, then JSON payload.
//
// Design decisions:
// - **JSON payloads.** The frame bodies are byte-compatible with the
//   original panel protocol, so existing clients keep working.
// - **Typed decode at the boundary.** The `type` and `relay` strings are
//   matched once, in `codec::decode`; everything downstream dispatches on
//   closed enums.
// - **No async runtime.** Uses `std::io::Read`/`Write` for framing,
//   compatible with both blocking TCP streams and buffered wrappers.

pub mod codec;
pub mod framing;
pub mod message;
pub mod types;

pub use codec::{DecodeError, decode, encode_snapshot};
pub use framing::{MAX_MESSAGE_SIZE, read_message, write_message};
pub use message::{ClientMessage, ServerMessage};
pub use types::{RELAY_COUNT, RelayId};
