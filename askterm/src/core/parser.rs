//! Turn an extracted payload into a typed [`Action`].

use serde_json::{Map, Value};

use crate::core::types::{Action, InvalidReason};

/// Parse an action payload.
///
/// The discriminator is read from `action`, falling back to `type`. Parsing
/// never fails; unusable payloads become [`Action::Invalid`].
pub fn parse_action(payload: &str) -> Action {
    let object = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(object)) => object,
        _ => return invalid(InvalidReason::MalformedPayload),
    };

    let kind = object
        .get("action")
        .or_else(|| object.get("type"))
        .and_then(Value::as_str);

    match kind {
        Some("command") => match string_field(&object, "command") {
            Some(text) => Action::Command { text },
            None => invalid(InvalidReason::MissingCommand),
        },
        Some("file") => match (
            string_field(&object, "path"),
            string_field(&object, "content"),
        ) {
            (Some(path), Some(content)) => Action::File { path, content },
            _ => invalid(InvalidReason::MissingField),
        },
        _ => invalid(InvalidReason::UnknownActionType),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn invalid(reason: InvalidReason) -> Action {
    Action::Invalid { reason }
}
