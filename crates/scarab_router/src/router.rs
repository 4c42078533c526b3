//! The central event dispatcher (spec §4.4).

use scarab_core::event::{ENTITY_CHANGED, ENTITY_CREATED, ENTITY_DESTROYED, SIMULATION_SHUTDOWN, TIME_UPDATED};
use scarab_core::{Event, EventQueue, SimTime};
use scarab_core::EntityId;
use scarab_entity::registry::EntityHandle;
use scarab_entity::{ChangeSet, EntityRegistry, HandlerBinding, HandlerKind, PropertySnapshot};
use serde_json::Value;

use crate::error::RouterError;
use crate::sink::EventSink;
use crate::subscriber_index::SubscriberIndex;

/// Which subscriber bucket an event belongs to, derived from its name (and,
/// for entity-lifecycle events, the entity name carried in its payload).
enum Target<'a> {
    TimeUpdated,
    Shutdown,
    Named(&'a str),
    Lifecycle(HandlerKind, &'a str),
}

fn lifecycle_name(event: &Event) -> Option<&str> {
    if let Some(name) = event.payload.get("scarab_name").and_then(Value::as_str) {
        return Some(name);
    }
    event.payload.get("view")?.get("scarab_name")?.as_str()
}

fn classify(event: &Event) -> Option<Target<'_>> {
    match event.event_name.as_str() {
        TIME_UPDATED => Some(Target::TimeUpdated),
        SIMULATION_SHUTDOWN => Some(Target::Shutdown),
        ENTITY_CREATED => lifecycle_name(event).map(|name| Target::Lifecycle(HandlerKind::Created, name)),
        ENTITY_CHANGED => lifecycle_name(event).map(|name| Target::Lifecycle(HandlerKind::Changed, name)),
        ENTITY_DESTROYED => lifecycle_name(event).map(|name| Target::Lifecycle(HandlerKind::Destroyed, name)),
        other => Some(Target::Named(other)),
    }
}

fn binding_matches(binding: &HandlerBinding, target: &Target<'_>) -> bool {
    match target {
        Target::TimeUpdated => binding.kind == HandlerKind::TimeUpdated,
        Target::Shutdown => binding.kind == HandlerKind::Shutdown,
        Target::Named(name) => {
            binding.kind == HandlerKind::NamedEvent && binding.selector.as_deref() == Some(*name)
        }
        Target::Lifecycle(kind, name) => {
            binding.kind == *kind && binding.selector.as_deref() == Some(*name)
        }
    }
}

/// Central dispatcher: owns entity registration and the subscriber index,
/// and drives dispatch for events drained from the caller-owned
/// [`EventQueue`].
#[derive(Default)]
pub struct EventRouter {
    registry: EntityRegistry,
    index: SubscriberIndex,
}

impl EventRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the registry, e.g. for inspecting entity count.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Register a new entity, recording its bindings and synthesizing a
    /// `scarab.entity.created` event at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Registration`] on duplicate registration, or
    /// [`RouterError::QueueOverflow`] (fatal) if the queue's sequence
    /// counter is exhausted.
    pub fn register(
        &mut self,
        entity: EntityHandle,
        now: SimTime,
        queue: &mut EventQueue,
    ) -> Result<EntityId, RouterError> {
        let id = self.registry.register(entity)?;
        let descriptor = self
            .registry
            .descriptor(id)
            .expect("descriptor exists immediately after registration");
        self.index.insert_entity(id, &descriptor.handlers);

        let payload = serde_json::to_value(&descriptor.last_view)
            .expect("EntityView always serializes");
        queue.push(Event::new(ENTITY_CREATED, now).with_payload(payload))?;
        Ok(id)
    }

    /// Deregister an entity, synthesizing a `scarab.entity.destroyed` event
    /// at `now` carrying its last-known view.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Registration`] if `id` is unknown, or
    /// [`RouterError::QueueOverflow`] (fatal).
    pub fn unregister(
        &mut self,
        id: EntityId,
        now: SimTime,
        queue: &mut EventQueue,
    ) -> Result<(), RouterError> {
        let descriptor = self.registry.unregister(id)?;
        self.index.remove_entity(id);

        let payload = serde_json::to_value(&descriptor.last_view)
            .expect("EntityView always serializes");
        queue.push(Event::new(ENTITY_DESTROYED, now).with_payload(payload))?;
        Ok(())
    }

    /// Enqueue a user (or otherwise caller-constructed) event.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::QueueOverflow`] (fatal) on sequence exhaustion.
    pub fn send(&mut self, event: Event, queue: &mut EventQueue) -> Result<(), RouterError> {
        queue.push(event)?;
        Ok(())
    }

    /// Drain and dispatch every event due at or before `now`, including any
    /// change events cascaded by handlers run during this call — the loop
    /// keeps draining at `now` until nothing more becomes due (spec §4.3).
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::QueueOverflow`] (fatal) if a cascaded event
    /// cannot be enqueued.
    pub fn dispatch_due(
        &mut self,
        queue: &mut EventQueue,
        now: SimTime,
        sinks: &mut [Box<dyn EventSink>],
    ) -> Result<(), RouterError> {
        loop {
            let due = queue.drain_due(now);
            if due.is_empty() {
                break;
            }
            for event in due {
                self.dispatch_one(event, now, queue, sinks)?;
            }
        }
        Ok(())
    }

    fn candidates_for(&self, target: &Target<'_>) -> Vec<EntityId> {
        match target {
            Target::TimeUpdated => self.index.time_updated().to_vec(),
            Target::Shutdown => self.index.shutdown().to_vec(),
            Target::Named(name) => self.index.named_event(name).to_vec(),
            Target::Lifecycle(kind, name) => self.index.lifecycle(*kind, name).to_vec(),
        }
    }

    fn dispatch_one(
        &mut self,
        event: Event,
        now: SimTime,
        queue: &mut EventQueue,
        sinks: &mut [Box<dyn EventSink>],
    ) -> Result<(), RouterError> {
        let Some(target) = classify(&event) else {
            tracing::debug!(event_name = %event.event_name, "dropping malformed lifecycle event (no scarab_name in payload)");
            for sink in sinks.iter_mut() {
                sink.publish(&event);
            }
            return Ok(());
        };

        let mut candidates = self.candidates_for(&target);
        if let Some(target_id) = event.target_id {
            if candidates.contains(&target_id) {
                candidates = vec![target_id];
            } else {
                tracing::debug!(
                    event_name = %event.event_name,
                    target_id = %target_id,
                    "targeted event dropped: no subscriber matched"
                );
                candidates.clear();
            }
        }

        for id in candidates {
            self.invoke(id, &event, &target, now, queue)?;
        }

        for sink in sinks.iter_mut() {
            sink.publish(&event);
        }
        Ok(())
    }

    fn invoke(
        &mut self,
        id: EntityId,
        event: &Event,
        target: &Target<'_>,
        now: SimTime,
        queue: &mut EventQueue,
    ) -> Result<(), RouterError> {
        let Some(handle) = self.registry.handle(id).cloned() else {
            return Ok(());
        };

        let matching_indices: Vec<usize> = match self.registry.descriptor(id) {
            Some(descriptor) => descriptor
                .handlers
                .iter()
                .enumerate()
                .filter(|(_, binding)| binding_matches(binding, target))
                .map(|(index, _)| index)
                .collect(),
            None => return Ok(()),
        };
        if matching_indices.is_empty() {
            return Ok(());
        }

        let pre_snapshot = self
            .registry
            .descriptor(id)
            .expect("checked above")
            .snapshot
            .clone();

        let mut guard = handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        for index in matching_indices {
            let result = {
                let descriptor = self
                    .registry
                    .descriptor_mut(id)
                    .expect("entity is still registered during its own handler invocation");
                let binding = &mut descriptor.handlers[index];
                (binding.invoker)(&mut *guard, event)
            };
            if let Err(cause) = result {
                tracing::error!(
                    event_name = %event.event_name,
                    entity_id = %id,
                    error = %cause,
                    "handler fault"
                );
            }
        }

        let mut new_view = guard.view();
        new_view.scarab_id = id;
        drop(guard);

        let changed_properties = pre_snapshot.diff(&new_view);
        if let Some(descriptor) = self.registry.descriptor_mut(id) {
            descriptor.snapshot = PropertySnapshot::capture(&new_view);
            descriptor.last_view = new_view.clone();
        }

        if !changed_properties.is_empty() {
            let change_set = ChangeSet {
                view: new_view,
                changed_properties,
            };
            let payload =
                serde_json::to_value(&change_set).expect("ChangeSet always serializes");
            queue.push(Event::new(ENTITY_CHANGED, now).with_payload(payload))?;
        }

        Ok(())
    }
}
