// Test-only panel client for controller integration tests.
//
// Wraps the real `PanelClient` (from `liftpanel_controller::client`) to
// provide a synchronous, test-friendly API for exercising the full control
// pipeline: connect → state sync → command → broadcast → verify.
//
// The only test-specific code here is the synchronous polling wrappers
// (blocking loops around `PanelClient::poll()`). All networking uses the
// same code paths as a real supervisor.
//
// See also: `tests/full_pipeline.rs` for the test scenarios.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use liftpanel_controller::client::PanelClient;
use liftpanel_protocol::message::ServerMessage;
use liftpanel_protocol::types::RelayId;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test client wrapping a real PanelClient.
pub struct TestPanelClient {
    client: PanelClient,
}

impl TestPanelClient {
    /// Connect to a controller; the connect itself waits for the initial
    /// state sync.
    pub fn connect(addr: SocketAddr) -> Self {
        // The controller binds 0.0.0.0; connect over loopback.
        let client = PanelClient::connect(&format!("127.0.0.1:{}", addr.port()))
            .expect("connect to controller");
        Self { client }
    }

    /// Command one relay.
    pub fn set_relay(&mut self, relay: RelayId, state: bool) {
        self.client.set_relay(relay, state).expect("send set_relay");
    }

    /// Last-known relay states.
    pub fn states(&self) -> &BTreeMap<RelayId, bool> {
        self.client.states()
    }

    /// Block until the next snapshot broadcast arrives, returning its
    /// states. Panics after `POLL_TIMEOUT`.
    pub fn wait_for_snapshot(&mut self) -> BTreeMap<RelayId, bool> {
        let deadline = Instant::now() + POLL_TIMEOUT;
        loop {
            let messages = self.client.poll();
            if let Some(ServerMessage::RelayState { states }) = messages.into_iter().next_back() {
                return states;
            }
            assert!(Instant::now() < deadline, "timed out waiting for snapshot");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Block until the last-known state of `relay` equals `expected`.
    pub fn wait_until_state(&mut self, relay: RelayId, expected: bool) {
        let deadline = Instant::now() + POLL_TIMEOUT;
        loop {
            self.client.poll();
            if self.client.states()[&relay] == expected {
                return;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {} to become {expected}",
                relay.name()
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Assert that no message arrives within `window`.
    pub fn assert_silent_for(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        while Instant::now() < deadline {
            let messages = self.client.poll();
            assert!(messages.is_empty(), "unexpected message: {messages:?}");
            thread::sleep(POLL_INTERVAL);
        }
    }
}
