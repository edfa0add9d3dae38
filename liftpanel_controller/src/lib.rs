// liftpanel_controller — relay controller service for the liftpanel panel.
//
// The controller exposes six binary outputs (elevator door and floor
// selection relays) over a persistent TCP message channel and reports their
// state to every connected observer. It is a dumb remote switch panel: it
// switches what it is told to switch and broadcasts the result. Sequencing
// (open door, wait, close, select floor) belongs to whatever supervisor
// drives it.
//
// Module overview:
// - `gpio.rs`:     The hardware boundary — `OutputPort` trait, the sysfs
//                  production port, and an in-memory port for tests.
// - `bank.rs`:     `RelayBank` — binding table, polarity handling, and the
//                  logical relay states. The only component that mutates
//                  relay state.
// - `session.rs`:  `Broadcaster` — connected-session tracking, join-time
//                  state sync, best-effort broadcast fan-out.
// - `dispatch.rs`: The single entry point for inbound frames: decode,
//                  route to the bank, re-broadcast the snapshot.
// - `server.rs`:   TCP listener, reader threads (one per session), and the
//                  main event loop. Uses `std::net` with a thread-per-reader
//                  architecture and an `mpsc` channel to funnel events into
//                  the single-threaded core.
// - `client.rs`:   `PanelClient` — the supervisor-side client.
//
// Dependencies: `liftpanel_protocol` (shared message types and framing).
//
// The controller can run as a standalone binary (`main.rs`) or be embedded
// in a host process via the library API (`start_controller`).

pub mod bank;
pub mod client;
pub mod dispatch;
pub mod gpio;
pub mod server;
pub mod session;

pub use server::start_controller;
