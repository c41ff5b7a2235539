//! Conversion of arbitrary named events into the canonical envelope.
//!
//! ```text
//! ("weather", {"rain":true})  ──► {"type":"weather","rain":true}
//! ("scores",  [1,2,3])        ──► {"type":"scores","data":[1,2,3]}
//! ("ping",    <no payload>)   ──► (nothing)
//! ```

use crate::error::ProtocolError;
use serde_json::{Map, Value};

const TYPE_KEY: &str = "type";
const DATA_KEY: &str = "data";

/// Canonical inbound message: always an object whose first key is `type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// The event name this envelope was built from.
    pub fn event_type(&self) -> &str {
        self.0.get(TYPE_KEY).and_then(Value::as_str).unwrap_or_default()
    }

    /// Compact JSON text, keys in envelope order.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(&self.0).map_err(|e| ProtocolError::Encode {
            event: self.event_type().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Builds the envelope for one inbound event.
///
/// Object payloads keep their keys (in order) after a leading `type`; an
/// existing `type` key is replaced. Anything else is wrapped as `data`.
/// An absent payload yields no envelope.
pub fn normalize(event: &str, payload: Option<Value>) -> Option<Envelope> {
    let payload = payload?;
    let mut fields = Map::new();
    fields.insert(TYPE_KEY.to_string(), Value::String(event.to_string()));

    match payload {
        Value::Object(original) => {
            for (key, value) in original {
                if key != TYPE_KEY {
                    fields.insert(key, value);
                }
            }
        }
        other => {
            fields.insert(DATA_KEY.to_string(), other);
        }
    }
    Some(Envelope(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope_json(event: &str, payload: Option<Value>) -> Option<String> {
        normalize(event, payload).map(|env| env.to_json().unwrap())
    }

    #[test]
    fn object_payload_gets_leading_type() {
        assert_eq!(
            envelope_json("weather", Some(json!({"rain": true}))).as_deref(),
            Some(r#"{"type":"weather","rain":true}"#)
        );
    }

    #[test]
    fn object_keys_keep_their_order() {
        let payload: Value = serde_json::from_str(r#"{"z":1,"a":{"nested":"}"},"m":null}"#).unwrap();
        assert_eq!(
            envelope_json("start", Some(payload)).as_deref(),
            Some(r#"{"type":"start","z":1,"a":{"nested":"}"},"m":null}"#)
        );
    }

    #[test]
    fn existing_type_key_is_overwritten() {
        let env = normalize("start", Some(json!({"type": "other", "exerciseId": "ex-7"}))).unwrap();
        assert_eq!(env.event_type(), "start");
        assert_eq!(
            env.to_json().unwrap(),
            r#"{"type":"start","exerciseId":"ex-7"}"#
        );
    }

    #[test]
    fn empty_object_becomes_type_only() {
        assert_eq!(
            envelope_json("tick", Some(json!({}))).as_deref(),
            Some(r#"{"type":"tick"}"#)
        );
    }

    #[test]
    fn non_object_payloads_are_wrapped() {
        let cases = [
            (json!([1, 2, 3]), r#"{"type":"scores","data":[1,2,3]}"#),
            (json!("hello"), r#"{"type":"scores","data":"hello"}"#),
            (json!(42), r#"{"type":"scores","data":42}"#),
            (json!(false), r#"{"type":"scores","data":false}"#),
            (Value::Null, r#"{"type":"scores","data":null}"#),
        ];
        for (payload, expected) in cases {
            assert_eq!(envelope_json("scores", Some(payload)).as_deref(), Some(expected));
        }
    }

    #[test]
    fn absent_payload_produces_nothing() {
        assert_eq!(normalize("ping", None), None);
    }

    #[test]
    fn event_names_are_escaped() {
        assert_eq!(
            envelope_json("say \"hi\"", Some(json!(1))).as_deref(),
            Some(r#"{"type":"say \"hi\"","data":1}"#)
        );
    }
}
