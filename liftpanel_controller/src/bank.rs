// Relay bank: the owner of all relay state.
//
// `RelayBank` holds the binding table (logical relay → GPIO line +
// polarity), the six logical states, and the output port. It is the only
// component that writes to output lines, and it is only ever touched from
// the server's single-threaded event loop — no internal locking.
//
// Polarity lives in the binding, not in the write path: the bank computes
// the drive level from the requested logical state and the binding's
// `active_low` flag in one place (`drive_level`). The stock panel hardware
// is all active-low (drive LOW to energize the relay), but nothing below
// this table assumes that.

use std::collections::BTreeMap;

use liftpanel_protocol::types::{RELAY_COUNT, RelayId};
use log::{debug, error, info};

use crate::gpio::{HardwareFault, Level, OutputPort};

/// Pairing of a logical relay with its physical output line and polarity.
/// `active_low = true` means the line is driven LOW to assert the logical
/// "on" state. Immutable after the bank is constructed.
#[derive(Clone, Copy, Debug)]
pub struct RelayBinding {
    pub relay: RelayId,
    pub line: u32,
    pub active_low: bool,
}

/// Binding table for the stock panel hardware: six active-low relay
/// modules on lines 16, 17, 18, 19, 21 and 22.
pub const DEFAULT_BINDINGS: [RelayBinding; RELAY_COUNT] = [
    RelayBinding { relay: RelayId::DoorOpen, line: 16, active_low: true },
    RelayBinding { relay: RelayId::DoorClose, line: 17, active_low: true },
    RelayBinding { relay: RelayId::Floor1, line: 18, active_low: true },
    RelayBinding { relay: RelayId::Floor2, line: 19, active_low: true },
    RelayBinding { relay: RelayId::Floor3, line: 21, active_low: true },
    RelayBinding { relay: RelayId::Floor4, line: 22, active_low: true },
];

/// Owns the bindings, the logical relay states, and the output port.
pub struct RelayBank<P: OutputPort> {
    // Indexed by RelayId discriminant; one binding per relay.
    bindings: [RelayBinding; RELAY_COUNT],
    states: [bool; RELAY_COUNT],
    outputs: P,
}

/// Drive level for a requested logical state under the given polarity.
fn drive_level(on: bool, active_low: bool) -> Level {
    let asserted = if active_low { Level::Low } else { Level::High };
    let deasserted = if active_low { Level::High } else { Level::Low };
    if on { asserted } else { deasserted }
}

impl<P: OutputPort> RelayBank<P> {
    /// Build a bank from a binding table. The table must cover every
    /// `RelayId` exactly once; any order is accepted.
    pub fn new(bindings: [RelayBinding; RELAY_COUNT], outputs: P) -> Self {
        let mut table = bindings;
        table.sort_by_key(|b| b.relay);
        debug_assert!(
            table.iter().zip(RelayId::ALL).all(|(b, r)| b.relay == r),
            "binding table must cover every relay exactly once"
        );
        Self {
            bindings: table,
            states: [false; RELAY_COUNT],
            outputs,
        }
    }

    pub fn with_default_bindings(outputs: P) -> Self {
        Self::new(DEFAULT_BINDINGS, outputs)
    }

    /// Configure every bound line as an output and drive it to the
    /// deasserted level for its polarity (logical "off"). Called once
    /// before the event loop starts; a failure here is fatal.
    pub fn initialize(&mut self) -> Result<(), HardwareFault> {
        for binding in &self.bindings {
            self.outputs
                .configure_output(binding.line)
                .map_err(|source| HardwareFault { line: binding.line, source })?;
            self.outputs
                .write_level(binding.line, drive_level(false, binding.active_low))
                .map_err(|source| HardwareFault { line: binding.line, source })?;
        }
        info!("relay outputs initialized, all {RELAY_COUNT} relays off");
        Ok(())
    }

    /// Switch one relay and return its new logical state. The only mutation
    /// path for relay state. A write failure after initialization is logged
    /// and not retried; the logical state still follows the request so
    /// observers converge on the commanded state.
    pub fn set(&mut self, relay: RelayId, on: bool) -> bool {
        let idx = relay as usize;
        let binding = self.bindings[idx];
        if let Err(e) = self
            .outputs
            .write_level(binding.line, drive_level(on, binding.active_low))
        {
            error!("write to gpio line {} failed: {e}", binding.line);
        }
        self.states[idx] = on;
        debug!("relay {} -> {}", relay.name(), if on { "on" } else { "off" });
        on
    }

    /// Current logical state of all six relays, in canonical order.
    pub fn snapshot(&self) -> BTreeMap<RelayId, bool> {
        RelayId::ALL.iter().map(|r| (*r, self.states[*r as usize])).collect()
    }
}
