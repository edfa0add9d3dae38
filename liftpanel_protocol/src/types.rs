// Relay identifiers for the control protocol.
//
// `RelayId` is the closed set of logical outputs the controller exposes. It
// is shared by the controller's relay bank and the wire messages — the relay
// bank indexes its binding table by it, and `message.rs` serializes it with
// the exact spellings the original panel clients use (`doorOpen`,
// `doorClose`, `floor1`..`floor4`).
//
// The derived `Ord` follows declaration order, which is the canonical order
// for state snapshots: door relays first, then floors bottom to top.

use serde::{Deserialize, Serialize};

/// Logical relay identifier. Fixed at build time — there is no runtime
/// discovery of outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayId {
    DoorOpen,
    DoorClose,
    Floor1,
    Floor2,
    Floor3,
    Floor4,
}

/// Number of relays the controller exposes.
pub const RELAY_COUNT: usize = 6;

impl RelayId {
    /// All relays in canonical snapshot order.
    pub const ALL: [RelayId; RELAY_COUNT] = [
        RelayId::DoorOpen,
        RelayId::DoorClose,
        RelayId::Floor1,
        RelayId::Floor2,
        RelayId::Floor3,
        RelayId::Floor4,
    ];

    /// Wire spelling of this relay, as used in the `relay` field of
    /// `set_relay` commands and the keys of `relay_state` snapshots.
    pub fn name(self) -> &'static str {
        match self {
            RelayId::DoorOpen => "doorOpen",
            RelayId::DoorClose => "doorClose",
            RelayId::Floor1 => "floor1",
            RelayId::Floor2 => "floor2",
            RelayId::Floor3 => "floor3",
            RelayId::Floor4 => "floor4",
        }
    }

    /// Parse a wire spelling. Returns `None` for anything outside the
    /// closed set — the codec turns that into `DecodeError::UnknownRelay`.
    pub fn from_name(name: &str) -> Option<RelayId> {
        RelayId::ALL.iter().copied().find(|r| r.name() == name)
    }
}
