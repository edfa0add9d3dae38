// Protocol messages for client-controller communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by panel clients to the controller.
// - `ServerMessage`: sent by the controller to panel clients.
//
// Both are internally tagged on a `type` field with snake_case tags, which
// produces the exact frames the original panel clients speak:
//
//   {"type":"set_relay","relay":"doorOpen","state":true}
//   {"type":"relay_state","states":{"doorOpen":true,...,"floor4":false}}
//
// Snapshots use a `BTreeMap<RelayId, bool>` so the six keys always serialize
// in canonical relay order. A snapshot always covers every relay — there are
// no partial or delta updates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::RelayId;

/// Messages sent by a client to the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request one relay to be switched on or off.
    SetRelay { relay: RelayId, state: bool },
}

/// Messages sent by the controller to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Complete logical state of all six relays. Sent to a client right
    /// after it connects and broadcast to everyone after each accepted
    /// command.
    RelayState { states: BTreeMap<RelayId, bool> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_relay_wire_shape() {
        let msg = ClientMessage::SetRelay {
            relay: RelayId::DoorOpen,
            state: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"set_relay","relay":"doorOpen","state":true}"#);
    }

    #[test]
    fn set_relay_parses_original_frame() {
        let json = r#"{"type":"set_relay","relay":"floor3","state":false}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetRelay {
                relay: RelayId::Floor3,
                state: false,
            }
        );
    }

    #[test]
    fn relay_state_wire_shape() {
        let mut states = BTreeMap::new();
        for relay in RelayId::ALL {
            states.insert(relay, relay == RelayId::DoorOpen);
        }
        let msg = ServerMessage::RelayState { states };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"type":"relay_state","states":{"#,
                r#""doorOpen":true,"doorClose":false,"#,
                r#""floor1":false,"floor2":false,"floor3":false,"floor4":false}}"#,
            )
        );
    }

    #[test]
    fn relay_state_keys_follow_canonical_order() {
        // Insert in reverse order; BTreeMap must still serialize canonically.
        let mut states = BTreeMap::new();
        for relay in RelayId::ALL.iter().rev() {
            states.insert(*relay, false);
        }
        let msg = ServerMessage::RelayState { states };
        let json = serde_json::to_string(&msg).unwrap();
        let door_open = json.find("doorOpen").unwrap();
        let floor4 = json.find("floor4").unwrap();
        assert!(door_open < floor4);
    }
}
