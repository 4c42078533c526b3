//! # scarab_router
//!
//! The event router: owns entity registration and the subscriber index,
//! and drives dispatch with lifecycle synthesis and change-detection
//! cascading (spec §4.4).

pub mod error;
pub mod router;
pub mod sink;
pub mod subscriber_index;

pub use error::RouterError;
pub use router::EventRouter;
pub use sink::EventSink;
pub use subscriber_index::SubscriberIndex;
