//! The Event Logger (spec §4.7): an optional secondary observer that writes
//! filtered, line-delimited JSON to stdout or a file.

use std::io::Write;

use scarab_core::event::{ENTITY_CHANGED, ENTITY_CREATED, ENTITY_DESTROYED, SIMULATION_SHUTDOWN, TIME_UPDATED};
use scarab_core::Event;
use scarab_router::EventSink;
use tracing::warn;

use crate::protocol::to_wire_json;

/// Which event families the logger admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLoggerFilter {
    /// `scarab.entity.created`, `scarab.entity.changed`, `scarab.entity.destroyed`.
    pub include_entity_lifecycle: bool,
    /// `scarab.time.updated` and `scarab.simulation.shutdown`.
    pub include_time: bool,
    /// Any event not in one of the reserved families.
    pub include_named: bool,
}

impl Default for EventLoggerFilter {
    fn default() -> Self {
        Self {
            include_entity_lifecycle: true,
            include_time: true,
            include_named: true,
        }
    }
}

impl EventLoggerFilter {
    fn admits(&self, event_name: &str) -> bool {
        match event_name {
            ENTITY_CREATED | ENTITY_CHANGED | ENTITY_DESTROYED => self.include_entity_lifecycle,
            TIME_UPDATED | SIMULATION_SHUTDOWN => self.include_time,
            _ => self.include_named,
        }
    }
}

/// Writes admitted events as single-line JSON to a destination.
///
/// File-open is the caller's responsibility (see
/// [`EventLogger::to_file`]); write failures are logged and swallowed —
/// spec §4.7 is explicit that logging errors never stop the simulation.
pub struct EventLogger {
    filter: EventLoggerFilter,
    destination: Box<dyn Write + Send>,
}

impl EventLogger {
    /// Build a logger writing to an arbitrary destination.
    #[must_use]
    pub fn new(filter: EventLoggerFilter, destination: Box<dyn Write + Send>) -> Self {
        Self { filter, destination }
    }

    /// Build a logger writing to stdout.
    #[must_use]
    pub fn to_stdout(filter: EventLoggerFilter) -> Self {
        Self::new(filter, Box::new(std::io::stdout()))
    }

    /// Build a logger writing to a newly created (or truncated) file.
    ///
    /// Returns `None` and logs a warning if the file cannot be opened,
    /// matching spec §4.7's "file-open failures are logged but do not
    /// propagate" — callers that get `None` simply run without a logger.
    #[must_use]
    pub fn to_file(filter: EventLoggerFilter, path: &std::path::Path) -> Option<Self> {
        match std::fs::File::create(path) {
            Ok(file) => Some(Self::new(filter, Box::new(file))),
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to open event log file");
                None
            }
        }
    }
}

impl EventSink for EventLogger {
    fn publish(&mut self, event: &Event) {
        if !self.filter.admits(&event.event_name) {
            return;
        }
        let line = match serde_json::to_string(&to_wire_json(event)) {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, event_name = %event.event_name, "failed to serialize event for log");
                return;
            }
        };
        if let Err(error) = writeln!(self.destination, "{line}") {
            warn!(%error, "failed to write event log line");
        }
    }
}
