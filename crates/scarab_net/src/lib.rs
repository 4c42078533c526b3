//! # scarab_net
//!
//! The WebSocket control server (spec §4.5) and the optional event logger
//! (spec §4.7) — the two observer implementations that sit downstream of
//! [`scarab_router::EventSink`].

pub mod error;
pub mod logger;
pub mod protocol;
pub mod server;

pub use error::NetError;
pub use logger::{EventLogger, EventLoggerFilter};
pub use protocol::{serialize, to_wire_json, ControlCommand};
pub use server::ControlServer;
