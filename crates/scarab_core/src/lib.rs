//! # scarab_core
//!
//! Clock, event record, and time-ordered queue primitives shared by every
//! other Scarab crate. This crate has no async runtime dependency — it is
//! pure data and single-threaded logic, usable from both the dispatch side
//! and (for serialisation) the network side.

pub mod clock;
pub mod event;
pub mod id;
pub mod queue;

pub use clock::{Clock, SimTime};
pub use event::Event;
pub use id::EntityId;
pub use queue::EventQueue;
