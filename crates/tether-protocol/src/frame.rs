//! Text framing for named events: `[eventName, arg0, arg1, ...]`.

use crate::error::ProtocolError;
use serde_json::Value;

/// Name the transport layer uses for its own connect notification.
pub const CONNECT_EVENT: &str = "connect";
/// Name the transport layer uses for its own disconnect notification.
pub const DISCONNECT_EVENT: &str = "disconnect";

/// Returns true for event names owned by the transport layer.
pub fn is_reserved(event: &str) -> bool {
    event == CONNECT_EVENT || event == DISCONNECT_EVENT
}

/// One named event with its (possibly empty) argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub args: Vec<Value>,
}

impl Frame {
    /// A frame carrying a single payload argument.
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            args: vec![payload],
        }
    }

    /// The payload of an event is its first argument, if any.
    pub fn payload(&self) -> Option<&Value> {
        self.args.first()
    }

    /// Splits the frame into its name and payload.
    pub fn into_parts(self) -> (String, Option<Value>) {
        let Frame { event, args } = self;
        (event, args.into_iter().next())
    }

    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ProtocolError::frame_decode(e.to_string(), raw))?;

        let Value::Array(items) = value else {
            return Err(ProtocolError::frame_decode("frame is not a JSON array", raw));
        };
        let mut items = items.into_iter();
        match items.next() {
            Some(Value::String(event)) => Ok(Self {
                event,
                args: items.collect(),
            }),
            Some(_) => Err(ProtocolError::frame_decode("event name is not a string", raw)),
            None => Err(ProtocolError::frame_decode("frame is empty", raw)),
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(Value::String(self.event.clone()));
        items.extend(self.args.iter().cloned());
        serde_json::to_string(&items).map_err(|e| ProtocolError::Encode {
            event: self.event.clone(),
            reason: e.to_string(),
        })
    }
}
