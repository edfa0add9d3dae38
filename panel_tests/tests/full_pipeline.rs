// End-to-end integration tests for the relay control pipeline.
//
// Each test starts a real controller (with an in-memory GPIO port),
// connects real PanelClient instances via TestPanelClient, and verifies the
// full path: connect → state sync → set_relay → relay bank → broadcast →
// every observer.
//
// These tests exercise the same code paths as a live deployment; the only
// test-specific pieces are the in-memory output port (so drive levels can
// be observed) and the synchronous polling wrappers in TestPanelClient.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use liftpanel_controller::gpio::{Level, MemoryOutputs};
use liftpanel_controller::server::{ControllerConfig, ControllerHandle, start_controller};
use liftpanel_protocol::framing::{read_message, write_message};
use liftpanel_protocol::message::ServerMessage;
use liftpanel_protocol::types::{RELAY_COUNT, RelayId};
use panel_tests::TestPanelClient;

/// Window after which "no broadcast happened" is considered settled.
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// Start a controller on a random port. Returns the handle, the bound
/// address, and an observer handle onto the GPIO port.
fn start_test_controller() -> (ControllerHandle, SocketAddr, MemoryOutputs) {
    let outputs = MemoryOutputs::new();
    let observer = outputs.clone();
    let config = ControllerConfig {
        port: 0,
        ..ControllerConfig::default()
    };
    let (handle, addr) = start_controller(config, outputs).unwrap();
    (handle, addr, observer)
}

/// A new connection is synced immediately: all relays off, all lines at
/// the deasserted (HIGH, active-low hardware) level.
#[test]
fn connect_receives_initial_sync() {
    let (handle, addr, outputs) = start_test_controller();

    let client = TestPanelClient::connect(addr);
    assert_eq!(client.states().len(), RELAY_COUNT);
    assert!(client.states().values().all(|on| !on));

    for line in [16, 17, 18, 19, 21, 22] {
        assert!(outputs.is_configured(line));
        assert_eq!(outputs.level(line), Some(Level::High));
    }

    handle.stop();
}

/// Scenario A: one client switches doorOpen on; the line is driven LOW and
/// every connected client receives the full snapshot.
#[test]
fn set_relay_drives_line_and_broadcasts_to_all() {
    let (handle, addr, outputs) = start_test_controller();

    let mut commander = TestPanelClient::connect(addr);
    let mut observer = TestPanelClient::connect(addr);

    commander.set_relay(RelayId::DoorOpen, true);

    let states = observer.wait_for_snapshot();
    assert!(states[&RelayId::DoorOpen]);
    for relay in RelayId::ALL.iter().filter(|r| **r != RelayId::DoorOpen) {
        assert!(!states[relay]);
    }
    assert_eq!(states.len(), RELAY_COUNT);

    // The commanding client receives the same broadcast.
    commander.wait_until_state(RelayId::DoorOpen, true);

    // Active-low: asserted means the line is LOW.
    assert_eq!(outputs.level(16), Some(Level::Low));

    handle.stop();
}

/// Scenario B: a client connecting after a mutation is synced to the
/// current state by its join-time unicast, before any broadcast reaches it.
#[test]
fn late_joiner_is_synced_to_current_state() {
    let (handle, addr, _outputs) = start_test_controller();

    let mut commander = TestPanelClient::connect(addr);
    commander.set_relay(RelayId::DoorOpen, true);
    commander.wait_until_state(RelayId::DoorOpen, true);

    let late = TestPanelClient::connect(addr);
    assert!(late.states()[&RelayId::DoorOpen]);
    assert!(!late.states()[&RelayId::Floor1]);

    handle.stop();
}

/// Scenario C: a truncated payload is dropped — no state change, no
/// broadcast — and the offending connection stays usable.
#[test]
fn malformed_payload_changes_nothing() {
    let (handle, addr, outputs) = start_test_controller();

    let mut observer = TestPanelClient::connect(addr);

    // Raw connection so we can push an arbitrary payload.
    let stream = TcpStream::connect(("127.0.0.1", addr.port())).unwrap();
    let mut raw_reader = BufReader::new(stream.try_clone().unwrap());
    let mut raw_writer = BufWriter::new(stream);
    let sync = read_message(&mut raw_reader).unwrap();
    let ServerMessage::RelayState { states } = serde_json::from_slice(&sync).unwrap();
    assert!(states.values().all(|on| !on));

    write_message(&mut raw_writer, br#"{"type":"set_relay""#).unwrap();

    observer.assert_silent_for(SILENCE_WINDOW);
    assert!(observer.states().values().all(|on| !on));
    assert_eq!(outputs.level(16), Some(Level::High));

    // The connection survives a dropped message: a valid command on the
    // same socket still goes through.
    write_message(
        &mut raw_writer,
        br#"{"type":"set_relay","relay":"doorClose","state":true}"#,
    )
    .unwrap();
    observer.wait_until_state(RelayId::DoorClose, true);
    assert_eq!(outputs.level(17), Some(Level::Low));

    handle.stop();
}

/// Unknown relay names and unknown message types are dropped the same way.
#[test]
fn unknown_relay_and_type_change_nothing() {
    let (handle, addr, _outputs) = start_test_controller();

    let mut observer = TestPanelClient::connect(addr);

    let stream = TcpStream::connect(("127.0.0.1", addr.port())).unwrap();
    let mut raw_reader = BufReader::new(stream.try_clone().unwrap());
    let mut raw_writer = BufWriter::new(stream);
    let _sync = read_message(&mut raw_reader).unwrap();

    write_message(
        &mut raw_writer,
        br#"{"type":"set_relay","relay":"penthouse","state":true}"#,
    )
    .unwrap();
    write_message(
        &mut raw_writer,
        br#"{"type":"reboot","relay":"doorOpen","state":true}"#,
    )
    .unwrap();

    observer.assert_silent_for(SILENCE_WINDOW);
    assert!(observer.states().values().all(|on| !on));

    handle.stop();
}

/// Last write wins per relay across a command sequence; each accepted
/// command produces one full-snapshot broadcast.
#[test]
fn command_sequence_is_last_write_wins() {
    let (handle, addr, outputs) = start_test_controller();

    let mut commander = TestPanelClient::connect(addr);

    commander.set_relay(RelayId::Floor1, true);
    commander.set_relay(RelayId::Floor1, false);
    commander.set_relay(RelayId::Floor2, true);

    commander.wait_until_state(RelayId::Floor2, true);
    assert!(!commander.states()[&RelayId::Floor1]);
    assert_eq!(outputs.level(18), Some(Level::High));
    assert_eq!(outputs.level(19), Some(Level::Low));

    handle.stop();
}

/// A client dropping its connection does not disturb delivery to the rest.
#[test]
fn broadcast_survives_disconnected_client() {
    let (handle, addr, _outputs) = start_test_controller();

    let mut commander = TestPanelClient::connect(addr);
    let doomed = TestPanelClient::connect(addr);
    drop(doomed);

    commander.set_relay(RelayId::Floor3, true);
    commander.wait_until_state(RelayId::Floor3, true);

    commander.set_relay(RelayId::Floor3, false);
    commander.wait_until_state(RelayId::Floor3, false);

    handle.stop();
}
