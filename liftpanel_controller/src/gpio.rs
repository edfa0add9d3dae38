// GPIO access layer.
//
// The controller's only hardware dependency is the ability to configure a
// line as an output and drive it high or low. That boundary is the
// `OutputPort` trait; the relay bank is generic over it and never touches
// the hardware interface directly.
//
// Two implementations:
// - `SysfsOutputs`: the production port, over the Linux sysfs GPIO
//   interface (`/sys/class/gpio`). Export, set direction, write value —
//   all synchronous file writes.
// - `MemoryOutputs`: an in-memory port for tests. Cloneable: the clone
//   shares state with the port handed to the bank, so a test can observe
//   drive levels while the bank owns the port.
//
// `HardwareFault` is raised only from `RelayBank::initialize` — a line that
// cannot be configured at startup is fatal, and the controller must not
// serve with an unverified output configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Drive level of a physical output line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Value written to a sysfs `value` file.
    fn sysfs_value(self) -> &'static str {
        match self {
            Level::Low => "0",
            Level::High => "1",
        }
    }
}

/// Synchronous access to output lines. Configuration can fail (missing
/// hardware, permissions); once a line is configured, writes are expected
/// to succeed for the life of the process.
pub trait OutputPort {
    fn configure_output(&mut self, line: u32) -> io::Result<()>;
    fn write_level(&mut self, line: u32, level: Level) -> io::Result<()>;
}

/// GPIO line could not be brought up at startup. Fatal — there is no
/// recovery path, the caller logs and exits.
#[derive(Debug, Error)]
#[error("gpio line {line} unavailable: {source}")]
pub struct HardwareFault {
    pub line: u32,
    #[source]
    pub source: io::Error,
}

/// Production port over the Linux sysfs GPIO interface.
pub struct SysfsOutputs {
    base: PathBuf,
}

impl SysfsOutputs {
    pub fn new() -> Self {
        Self::with_base("/sys/class/gpio")
    }

    /// Use a different sysfs root. Tests point this at a scratch directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn line_dir(&self, line: u32) -> PathBuf {
        self.base.join(format!("gpio{line}"))
    }
}

impl Default for SysfsOutputs {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputPort for SysfsOutputs {
    fn configure_output(&mut self, line: u32) -> io::Result<()> {
        // Exporting an already-exported line fails, so skip the export when
        // the kernel has the directory up.
        if !self.line_dir(line).exists() {
            fs::write(self.base.join("export"), line.to_string())?;
        }
        fs::write(self.line_dir(line).join("direction"), "out")
    }

    fn write_level(&mut self, line: u32, level: Level) -> io::Result<()> {
        fs::write(self.line_dir(line).join("value"), level.sysfs_value())
    }
}

#[derive(Default)]
struct MemoryState {
    configured: BTreeSet<u32>,
    levels: BTreeMap<u32, Level>,
}

/// In-memory port for tests. All clones share the same recorded state.
#[derive(Clone, Default)]
pub struct MemoryOutputs {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to `line`, or `None` if never written.
    pub fn level(&self, line: u32) -> Option<Level> {
        self.lock().levels.get(&line).copied()
    }

    /// Whether `line` was configured as an output.
    pub fn is_configured(&self, line: u32) -> bool {
        self.lock().configured.contains(&line)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl OutputPort for MemoryOutputs {
    fn configure_output(&mut self, line: u32) -> io::Result<()> {
        self.lock().configured.insert(line);
        Ok(())
    }

    fn write_level(&mut self, line: u32, level: Level) -> io::Result<()> {
        let mut state = self.lock();
        if !state.configured.contains(&line) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("line {line} not configured as output"),
            ));
        }
        state.levels.insert(line, level);
        Ok(())
    }
}
