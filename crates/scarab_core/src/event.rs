//! The [`Event`] record and the reserved system event-name families.
//!
//! Four lifecycle families plus shutdown are reserved and must appear
//! verbatim on the wire (spec §3). Anything else is a user event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::SimTime;
use crate::id::EntityId;

/// `scarab.time.updated` — emitted once per tick.
pub const TIME_UPDATED: &str = "scarab.time.updated";
/// `scarab.entity.created` — emitted once per successful registration.
pub const ENTITY_CREATED: &str = "scarab.entity.created";
/// `scarab.entity.changed` — emitted when tracked properties diverge.
pub const ENTITY_CHANGED: &str = "scarab.entity.changed";
/// `scarab.entity.destroyed` — emitted once per deregistration.
pub const ENTITY_DESTROYED: &str = "scarab.entity.destroyed";
/// `scarab.simulation.shutdown` — emitted once, at the end of a run.
pub const SIMULATION_SHUTDOWN: &str = "scarab.simulation.shutdown";

/// Returns `true` if `name` is one of the reserved system event-name
/// families rather than a user event.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        TIME_UPDATED | ENTITY_CREATED | ENTITY_CHANGED | ENTITY_DESTROYED | SIMULATION_SHUTDOWN
    )
}

/// A tagged record dispatched by the router: a name, the sim-time it was
/// dispatched at, an optional target entity, and an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_name: String,
    pub sim_time: SimTime,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_id: Option<EntityId>,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    /// Construct a user event with no target and no payload.
    #[must_use]
    pub fn new(event_name: impl Into<String>, sim_time: SimTime) -> Self {
        Self {
            event_name: event_name.into(),
            sim_time,
            target_id: None,
            payload: Value::Null,
        }
    }

    /// Attach a payload, replacing whatever was there.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Restrict delivery to a single entity.
    #[must_use]
    pub fn with_target(mut self, target_id: EntityId) -> Self {
        self.target_id = Some(target_id);
        self
    }

    /// Returns `true` if this is one of the reserved system events.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        is_reserved(&self.event_name)
    }
}
