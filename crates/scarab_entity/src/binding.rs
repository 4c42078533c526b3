//! Handler discovery without reflection (Design Note 9, option (a)).
//!
//! The source language discovers handlers by attribute decorators. Rust has
//! no runtime reflection, so each entity declares its bindings once, up
//! front, via [`ScarabEntity::bindings`] — a builder-style list the
//! registry reads exactly once at registration time.

use std::any::Any;

use scarab_core::Event;

use crate::view::EntityView;

/// What kind of occurrence a [`HandlerBinding`] reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Another entity (matching `selector`) was registered.
    Created,
    /// Another entity (matching `selector`) had a tracked property change.
    Changed,
    /// Another entity (matching `selector`) was deregistered.
    Destroyed,
    /// The clock advanced.
    TimeUpdated,
    /// The simulation is shutting down.
    Shutdown,
    /// A user event (matching `selector` as the event name) was sent.
    NamedEvent,
}

/// The outcome of a handler invocation. Mirrors the "HandlerFault" taxonomy
/// in spec §7: an `Err` here is logged by the router and never aborts the
/// tick for other subscribers.
pub type HandlerResult = Result<(), anyhow::Error>;

/// A callable bound to one entity for one event selector.
///
/// `selector` is the entity-name a lifecycle binding is interested in (for
/// `Created`/`Changed`/`Destroyed`) or the event name a `NamedEvent` binding
/// is interested in. It is `None` for `TimeUpdated` and `Shutdown`, which
/// fire unconditionally.
pub struct HandlerBinding {
    pub kind: HandlerKind,
    pub selector: Option<String>,
    pub invoker: Box<dyn FnMut(&mut dyn ScarabEntity, &Event) -> HandlerResult + Send>,
}

impl std::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("kind", &self.kind)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl HandlerBinding {
    /// Build a binding for `Created`/`Changed`/`Destroyed`/`NamedEvent`,
    /// which all require a selector.
    pub fn new(
        kind: HandlerKind,
        selector: impl Into<String>,
        invoker: impl FnMut(&mut dyn ScarabEntity, &Event) -> HandlerResult + Send + 'static,
    ) -> Self {
        Self {
            kind,
            selector: Some(selector.into()),
            invoker: Box::new(invoker),
        }
    }

    /// Build a `TimeUpdated` or `Shutdown` binding, which has no selector.
    pub fn unconditional(
        kind: HandlerKind,
        invoker: impl FnMut(&mut dyn ScarabEntity, &Event) -> HandlerResult + Send + 'static,
    ) -> Self {
        debug_assert!(matches!(kind, HandlerKind::TimeUpdated | HandlerKind::Shutdown));
        Self {
            kind,
            selector: None,
            invoker: Box::new(invoker),
        }
    }
}

/// A user-supplied, stateful simulation object.
///
/// Replaces the source language's attribute introspection (Design Note 9):
/// `view` is the explicit public-properties projection, and `bindings` is
/// the explicit handler list, both computed once per entity rather than
/// discovered by reflection.
pub trait ScarabEntity: Any + Send {
    /// The domain-level type tag (distinct from the Rust type name).
    fn scarab_name(&self) -> &str;

    /// Optional interface-like grouping tag.
    fn scarab_conforms_to(&self) -> Option<&str> {
        None
    }

    /// Project this entity's current public state.
    fn view(&self) -> EntityView;

    /// Declare this entity's handler bindings. Called exactly once, at
    /// registration.
    fn bindings(&self) -> Vec<HandlerBinding>;

    /// Escape hatch so the router can recover the concrete type from a
    /// `&mut dyn ScarabEntity` invoker parameter.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
