//! The observer contract shared by the control server and the event logger.
//!
//! The router knows nothing about WebSockets or files — it just hands every
//! dispatched event to each registered sink, in order, after that event's
//! handlers have all run (spec §4.4 bullet 4). `scarab_net` provides the
//! concrete sinks.

use scarab_core::Event;

/// Something that wants to observe every event the router dispatches.
pub trait EventSink: Send {
    fn publish(&mut self, event: &Event);
}
