//! Subscriber indexing for the router (spec §4.4).
//!
//! Indexed twofold, as the spec requires: by event-name for named events,
//! and by `(kind, scarab_name)` for entity-lifecycle and entity-change
//! bindings. Each bucket is an append-only `Vec`, so lookup is an expected
//! O(1) hash lookup and the bucket itself preserves registration order —
//! the same trick the teacher engine uses for `dashmap`-backed indices,
//! rendered here with plain `HashMap` since the index is only ever touched
//! from the single dispatch thread.

use std::collections::HashMap;

use scarab_core::EntityId;
use scarab_entity::{HandlerBinding, HandlerKind};

/// The subscriber index: maps event selectors to the ids of entities with a
/// matching [`HandlerBinding`], in registration order.
#[derive(Default)]
pub struct SubscriberIndex {
    by_named_event: HashMap<String, Vec<EntityId>>,
    by_lifecycle: HashMap<(HandlerKind, String), Vec<EntityId>>,
    time_updated: Vec<EntityId>,
    shutdown: Vec<EntityId>,
}

impl SubscriberIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every binding an entity declared, in the order they were
    /// declared.
    pub fn insert_entity(&mut self, id: EntityId, handlers: &[HandlerBinding]) {
        for binding in handlers {
            match (binding.kind, &binding.selector) {
                (HandlerKind::TimeUpdated, _) => push_unique(&mut self.time_updated, id),
                (HandlerKind::Shutdown, _) => push_unique(&mut self.shutdown, id),
                (HandlerKind::NamedEvent, Some(selector)) => {
                    push_unique(self.by_named_event.entry(selector.clone()).or_default(), id);
                }
                (kind, Some(selector)) => {
                    push_unique(
                        self.by_lifecycle.entry((kind, selector.clone())).or_default(),
                        id,
                    );
                }
                (_, None) => {
                    // A lifecycle/named binding with no selector is a
                    // malformed binding; the entity author built it wrong.
                    // Dropping it here is the router's analogue of spec
                    // §7's "handler with an unsupported shape" case.
                }
            }
        }
    }

    /// Remove an entity from every bucket it may appear in.
    pub fn remove_entity(&mut self, id: EntityId) {
        self.time_updated.retain(|existing| *existing != id);
        self.shutdown.retain(|existing| *existing != id);
        for bucket in self.by_named_event.values_mut() {
            bucket.retain(|existing| *existing != id);
        }
        for bucket in self.by_lifecycle.values_mut() {
            bucket.retain(|existing| *existing != id);
        }
    }

    /// Candidate subscribers for a `time.updated` event.
    #[must_use]
    pub fn time_updated(&self) -> &[EntityId] {
        &self.time_updated
    }

    /// Candidate subscribers for a `shutdown` event.
    #[must_use]
    pub fn shutdown(&self) -> &[EntityId] {
        &self.shutdown
    }

    /// Candidate subscribers for a named user event.
    #[must_use]
    pub fn named_event(&self, event_name: &str) -> &[EntityId] {
        self.by_named_event
            .get(event_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidate subscribers for an entity-lifecycle event concerning
    /// entities named `scarab_name`.
    #[must_use]
    pub fn lifecycle(&self, kind: HandlerKind, scarab_name: &str) -> &[EntityId] {
        self.by_lifecycle
            .get(&(kind, scarab_name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn push_unique(bucket: &mut Vec<EntityId>, id: EntityId) {
    if !bucket.contains(&id) {
        bucket.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarab_core::Event;

    fn binding(kind: HandlerKind, selector: Option<&str>) -> HandlerBinding {
        match (kind, selector) {
            (HandlerKind::TimeUpdated, _) => {
                HandlerBinding::unconditional(kind, |_e, _ev: &Event| Ok(()))
            }
            (HandlerKind::Shutdown, _) => {
                HandlerBinding::unconditional(kind, |_e, _ev: &Event| Ok(()))
            }
            (_, Some(selector)) => HandlerBinding::new(kind, selector, |_e, _ev: &Event| Ok(())),
            _ => unreachable!(),
        }
    }

    #[test]
    fn time_updated_bucket_preserves_registration_order() {
        let mut index = SubscriberIndex::new();
        let a = EntityId::new();
        let b = EntityId::new();
        index.insert_entity(a, &[binding(HandlerKind::TimeUpdated, None)]);
        index.insert_entity(b, &[binding(HandlerKind::TimeUpdated, None)]);
        assert_eq!(index.time_updated(), &[a, b]);
    }

    #[test]
    fn lifecycle_bucket_is_keyed_by_kind_and_name() {
        let mut index = SubscriberIndex::new();
        let hive = EntityId::new();
        index.insert_entity(
            hive,
            &[binding(HandlerKind::Created, Some("bee"))],
        );
        assert_eq!(index.lifecycle(HandlerKind::Created, "bee"), &[hive]);
        assert!(index.lifecycle(HandlerKind::Created, "wasp").is_empty());
        assert!(index.lifecycle(HandlerKind::Changed, "bee").is_empty());
    }

    #[test]
    fn remove_entity_clears_every_bucket() {
        let mut index = SubscriberIndex::new();
        let id = EntityId::new();
        index.insert_entity(
            id,
            &[
                binding(HandlerKind::TimeUpdated, None),
                binding(HandlerKind::NamedEvent, Some("ping")),
            ],
        );
        index.remove_entity(id);
        assert!(index.time_updated().is_empty());
        assert!(index.named_event("ping").is_empty());
    }
}
