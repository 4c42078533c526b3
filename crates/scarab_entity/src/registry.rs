//! Entity registration and descriptor storage (spec §4.2).
//!
//! Registration inspects an entity exactly once: its declared handler
//! bindings are recorded, a fresh [`EntityId`] is minted, and an initial
//! [`PropertySnapshot`] is captured. Entities are held behind
//! `Arc<Mutex<dyn ScarabEntity>>` rather than owned outright, so a caller
//! can keep its own handle to an entity after registering it (to mutate it
//! directly, outside of handler dispatch) and so the same handle can be
//! detected if accidentally registered twice.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use scarab_core::EntityId;

use crate::binding::{HandlerBinding, ScarabEntity};
use crate::snapshot::PropertySnapshot;
use crate::view::EntityView;

/// A shared handle to a registered entity.
pub type EntityHandle = Arc<Mutex<dyn ScarabEntity>>;

/// Registration-time failures (spec §7, `RegistrationError`).
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("entity is already registered")]
    DuplicateRegistration,
    #[error("unknown entity id: {0}")]
    UnknownEntity(EntityId),
}

/// Everything the kernel records about a registered entity.
pub struct EntityDescriptor {
    pub id: EntityId,
    pub scarab_name: String,
    pub conforms_to: Option<String>,
    pub handlers: Vec<HandlerBinding>,
    pub snapshot: PropertySnapshot,
    pub last_view: EntityView,
}

/// Storage for every currently-registered entity and its descriptor.
#[derive(Default)]
pub struct EntityRegistry {
    handles: HashMap<EntityId, EntityHandle>,
    descriptors: HashMap<EntityId, EntityDescriptor>,
    /// Preserves registration order for iteration (spec invariant 4:
    /// "stable registration order").
    order: Vec<EntityId>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new entity, returning its freshly minted id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateRegistration`] if this exact
    /// handle (by pointer identity) is already registered.
    pub fn register(&mut self, entity: EntityHandle) -> Result<EntityId, RegistrationError> {
        if self.handles.values().any(|existing| Arc::ptr_eq(existing, &entity)) {
            return Err(RegistrationError::DuplicateRegistration);
        }

        let (scarab_name, conforms_to, mut initial_view, handlers) = {
            let guard = entity.lock().expect("entity mutex poisoned");
            (
                guard.scarab_name().to_string(),
                guard.scarab_conforms_to().map(str::to_string),
                guard.view(),
                guard.bindings(),
            )
        };

        // `scarab_id` is the registry's to assign (spec §4.2), not the
        // entity's — whatever placeholder id the entity's own `view()`
        // returned is replaced here so it stays stable across every
        // subsequent created/changed/destroyed event for this entity.
        let id = EntityId::new();
        initial_view.scarab_id = id;

        let descriptor = EntityDescriptor {
            id,
            scarab_name,
            conforms_to,
            handlers,
            snapshot: PropertySnapshot::capture(&initial_view),
            last_view: initial_view,
        };

        self.handles.insert(id, entity);
        self.descriptors.insert(id, descriptor);
        self.order.push(id);
        Ok(id)
    }

    /// Remove an entity, returning its final descriptor (for the caller to
    /// build the `destroyed` event payload from).
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnknownEntity`] if `id` was never
    /// registered or was already removed.
    pub fn unregister(&mut self, id: EntityId) -> Result<EntityDescriptor, RegistrationError> {
        self.handles
            .remove(&id)
            .ok_or(RegistrationError::UnknownEntity(id))?;
        self.order.retain(|existing| *existing != id);
        self.descriptors
            .remove(&id)
            .ok_or(RegistrationError::UnknownEntity(id))
    }

    /// Borrow an entity's shared handle.
    #[must_use]
    pub fn handle(&self, id: EntityId) -> Option<&EntityHandle> {
        self.handles.get(&id)
    }

    /// Borrow an entity's descriptor.
    #[must_use]
    pub fn descriptor(&self, id: EntityId) -> Option<&EntityDescriptor> {
        self.descriptors.get(&id)
    }

    /// Mutably borrow an entity's descriptor (used to update its snapshot
    /// and last-known view after a handler runs).
    pub fn descriptor_mut(&mut self, id: EntityId) -> Option<&mut EntityDescriptor> {
        self.descriptors.get_mut(&id)
    }

    /// Iterate over every registered entity id, in registration order.
    pub fn ids_in_order(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    /// Number of currently-registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
