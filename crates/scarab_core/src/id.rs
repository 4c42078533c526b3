//! Entity identity.
//!
//! An [`EntityId`] is a stable, globally unique UUID assigned once at
//! registration. Unlike the teacher engine's `u64` allocator, identity here
//! has no ordering meaning — entities are not archetype members, so there is
//! no benefit to a dense integer space, and the spec requires a UUID on the
//! wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique, never-reused entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the identifier's canonical string form.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
