//! # scarab_entity
//!
//! Entity identity projection, reflection-free handler discovery, the
//! entity registry, and property-change detection. Builds on [`scarab_core`]
//! for [`scarab_core::EntityId`] and [`scarab_core::Event`].

pub mod binding;
pub mod registry;
pub mod snapshot;
pub mod view;

pub use binding::{HandlerBinding, HandlerKind, HandlerResult, ScarabEntity};
pub use registry::{EntityDescriptor, EntityHandle, EntityRegistry, RegistrationError};
pub use snapshot::PropertySnapshot;
pub use view::{ChangeSet, EntityView};
