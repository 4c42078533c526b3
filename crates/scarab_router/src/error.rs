//! Router-level error taxonomy (spec §7).

use scarab_core::queue::SequenceOverflow;
use scarab_entity::RegistrationError;

/// Errors the router's public contract can return.
///
/// [`RouterError::QueueOverflow`] is the only variant a caller should treat
/// as fatal — spec §7 classifies queue sequence overflow as an
/// `InvariantViolation` that must initiate shutdown immediately. Everything
/// else is recoverable: the caller logs it and keeps running.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("fatal invariant violation: {0}")]
    QueueOverflow(#[from] SequenceOverflow),
}

impl RouterError {
    /// Whether this error should be treated as an `InvariantViolation`
    /// (spec §7) — fatal, shutdown-now — rather than a recoverable,
    /// logged-and-continue error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, RouterError::QueueOverflow(_))
    }
}
