//! Wire envelopes (spec §6).
//!
//! The router's internal [`Event`] carries its lifecycle payload as the raw
//! [`scarab_entity::EntityView`]/`ChangeSet` JSON the router built while
//! dispatching. This module re-shapes that internal representation into the
//! five envelope forms the wire protocol actually specifies, and parses the
//! four client control commands.

use scarab_core::event::{ENTITY_CHANGED, ENTITY_CREATED, ENTITY_DESTROYED, SIMULATION_SHUTDOWN, TIME_UPDATED};
use scarab_core::Event;
use serde_json::{Map, Value};

use crate::error::NetError;

/// Convert a dispatched event into its wire-format JSON object.
#[must_use]
pub fn to_wire_json(event: &Event) -> Value {
    let mut envelope = Map::new();
    envelope.insert("event_name".to_string(), Value::String(event.event_name.clone()));
    envelope.insert("sim_time".to_string(), Value::from(event.sim_time));
    if let Some(target_id) = event.target_id {
        envelope.insert(
            "target_id".to_string(),
            serde_json::to_value(target_id).unwrap_or(Value::Null),
        );
    }

    match event.event_name.as_str() {
        TIME_UPDATED => {
            if let Some(previous_time) = event.payload.get("previous_time") {
                envelope.insert("previous_time".to_string(), previous_time.clone());
            }
        }
        ENTITY_CREATED | ENTITY_DESTROYED => {
            envelope.insert("entity".to_string(), event.payload.clone());
        }
        ENTITY_CHANGED => {
            if let Some(view) = event.payload.get("view") {
                envelope.insert("entity".to_string(), view.clone());
            }
            if let Some(changed) = event.payload.get("changed_properties") {
                envelope.insert("changed_properties".to_string(), changed.clone());
            }
        }
        SIMULATION_SHUTDOWN => {}
        _user_event => match &event.payload {
            Value::Object(fields) => {
                for (key, value) in fields {
                    envelope.insert(key.clone(), value.clone());
                }
            }
            Value::Null => {}
            other => {
                envelope.insert("payload".to_string(), other.clone());
            }
        },
    }

    Value::Object(envelope)
}

/// Serialize an event to the single-line JSON text frame the wire protocol
/// sends.
///
/// # Errors
///
/// Returns [`NetError::Serialize`] if the resulting value cannot be
/// rendered as a JSON string (unreachable for well-formed payloads, but the
/// router never trusts user payloads blindly).
pub fn serialize(event: &Event) -> Result<String, NetError> {
    Ok(serde_json::to_string(&to_wire_json(event))?)
}

/// A command sent by a connected observer (spec §4.5/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Pause,
    Resume,
    Shutdown,
}

/// Parse a client-sent JSON object into a [`ControlCommand`].
///
/// Any other shape, or an unrecognized `action`, returns `None` — the
/// caller logs and ignores it (spec §4.5: "Any other shape is logged and
/// ignored. Unrecognized actions are ignored.").
#[must_use]
pub fn parse_command(text: &str) -> Option<ControlCommand> {
    let value: Value = serde_json::from_str(text).ok()?;
    let action = value.get("action")?.as_str()?;
    match action {
        "start" => Some(ControlCommand::Start),
        "pause" => Some(ControlCommand::Pause),
        "resume" => Some(ControlCommand::Resume),
        "shutdown" => Some(ControlCommand::Shutdown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarab_core::EntityId;
    use serde_json::json;

    #[test]
    fn time_updated_envelope_carries_previous_time() {
        let event = Event::new(TIME_UPDATED, 5).with_payload(json!({"previous_time": 4}));
        let wire = to_wire_json(&event);
        assert_eq!(wire["event_name"], "scarab.time.updated");
        assert_eq!(wire["sim_time"], 5);
        assert_eq!(wire["previous_time"], 4);
    }

    #[test]
    fn created_envelope_wraps_payload_as_entity() {
        let view_json = json!({"scarab_name": "bee", "scarab_id": EntityId::new(), "scarab_conforms_to": null, "temp": 70});
        let event = Event::new(ENTITY_CREATED, 0).with_payload(view_json.clone());
        let wire = to_wire_json(&event);
        assert_eq!(wire["entity"], view_json);
    }

    #[test]
    fn changed_envelope_lifts_view_and_changed_properties() {
        let view_json = json!({"scarab_name": "bee", "scarab_id": EntityId::new(), "scarab_conforms_to": null, "temp": 71});
        let payload = json!({"view": view_json, "changed_properties": ["temp"]});
        let event = Event::new(ENTITY_CHANGED, 1).with_payload(payload);
        let wire = to_wire_json(&event);
        assert_eq!(wire["entity"]["temp"], 71);
        assert_eq!(wire["changed_properties"], json!(["temp"]));
        assert!(wire.get("view").is_none());
    }

    #[test]
    fn shutdown_envelope_has_no_extra_fields() {
        let event = Event::new(SIMULATION_SHUTDOWN, 10);
        let wire = to_wire_json(&event);
        assert_eq!(wire.as_object().unwrap().len(), 2);
    }

    #[test]
    fn user_event_object_payload_is_flattened() {
        let event = Event::new("ping", 3).with_payload(json!({"note": "hello"}));
        let wire = to_wire_json(&event);
        assert_eq!(wire["note"], "hello");
        assert_eq!(wire["event_name"], "ping");
    }

    #[test]
    fn parses_known_actions() {
        assert_eq!(parse_command(r#"{"action":"start"}"#), Some(ControlCommand::Start));
        assert_eq!(parse_command(r#"{"action":"pause"}"#), Some(ControlCommand::Pause));
        assert_eq!(parse_command(r#"{"action":"resume"}"#), Some(ControlCommand::Resume));
        assert_eq!(parse_command(r#"{"action":"shutdown"}"#), Some(ControlCommand::Shutdown));
    }

    #[test]
    fn unknown_action_and_malformed_frames_are_ignored() {
        assert_eq!(parse_command(r#"{"action":"launch"}"#), None);
        assert_eq!(parse_command("not json"), None);
        assert_eq!(parse_command(r#"{"nonsense": true}"#), None);
    }
}
