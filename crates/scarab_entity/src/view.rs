//! The serialised, public projection of an entity (spec §3, "EntityView").
//!
//! Never contains handler references or private state — only the mandatory
//! `scarab_*` fields and the entity's public, data-valued properties,
//! flattened into a single JSON object on the wire.

use std::fmt;

use scarab_core::EntityId;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// The public projection of an entity transmitted in lifecycle events.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub scarab_name: String,
    pub scarab_id: EntityId,
    pub scarab_conforms_to: Option<String>,
    /// Public, data-valued properties. Names beginning with `_` must never
    /// be inserted here — entity authors are expected to exclude them in
    /// `ScarabEntity::view`.
    pub properties: Map<String, Value>,
}

impl EntityView {
    /// Start building a view for the given entity identity.
    #[must_use]
    pub fn new(scarab_name: impl Into<String>, scarab_id: EntityId) -> Self {
        Self {
            scarab_name: scarab_name.into(),
            scarab_id,
            scarab_conforms_to: None,
            properties: Map::new(),
        }
    }

    /// Tag this view with an interface-like grouping name.
    #[must_use]
    pub fn with_conforms_to(mut self, conforms_to: impl Into<String>) -> Self {
        self.scarab_conforms_to = Some(conforms_to.into());
        self
    }

    /// Set a single public property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Replace the whole property map at once.
    #[must_use]
    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }
}

// EntityView flattens `scarab_name`/`scarab_id`/`scarab_conforms_to` and every
// property into one JSON object (spec §6), so the mandatory fields and the
// property map are serialised manually rather than via `#[derive]`.
impl Serialize for EntityView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + self.properties.len()))?;
        map.serialize_entry("scarab_name", &self.scarab_name)?;
        map.serialize_entry("scarab_id", &self.scarab_id)?;
        map.serialize_entry("scarab_conforms_to", &self.scarab_conforms_to)?;
        for (key, value) in &self.properties {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EntityView {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntityViewVisitor;

        impl<'de> Visitor<'de> for EntityViewVisitor {
            type Value = EntityView;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an entity view object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut scarab_name = None;
                let mut scarab_id = None;
                let mut scarab_conforms_to = None;
                let mut properties = Map::new();

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "scarab_name" => scarab_name = Some(map.next_value()?),
                        "scarab_id" => scarab_id = Some(map.next_value()?),
                        "scarab_conforms_to" => scarab_conforms_to = map.next_value()?,
                        _ => {
                            let value: Value = map.next_value()?;
                            properties.insert(key, value);
                        }
                    }
                }

                Ok(EntityView {
                    scarab_name: scarab_name.ok_or_else(|| de::Error::missing_field("scarab_name"))?,
                    scarab_id: scarab_id.ok_or_else(|| de::Error::missing_field("scarab_id"))?,
                    scarab_conforms_to,
                    properties,
                })
            }
        }

        deserializer.deserialize_map(EntityViewVisitor)
    }
}

/// The payload of a `scarab.entity.changed` event: the new view plus the
/// names of properties that diverged from the previous snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeSet {
    pub view: EntityView,
    pub changed_properties: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarab_core::EntityId;

    #[test]
    fn roundtrips_through_json() {
        let id = EntityId::new();
        let view = EntityView::new("bee", id)
            .with_conforms_to("insect")
            .with_property("temp", 70)
            .with_property("name", "worker-1");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["scarab_name"], "bee");
        assert_eq!(json["temp"], 70);

        let back: EntityView = serde_json::from_value(json).unwrap();
        assert_eq!(back, view);
    }

    #[test]
    fn conforms_to_defaults_to_none() {
        let view = EntityView::new("bee", EntityId::new());
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["scarab_conforms_to"].is_null());
    }
}
