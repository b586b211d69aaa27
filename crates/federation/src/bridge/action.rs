use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to transition shared state, identified by `slice/verb`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    /// Action carrying `payload` as JSON. A payload that cannot be
    /// represented is logged and sent as `null`.
    pub fn with_payload(kind: impl Into<String>, payload: impl Serialize) -> Self {
        let kind = kind.into();
        let payload = serde_json::to_value(payload).unwrap_or_else(|e| {
            tracing::warn!("Payload of '{}' is not representable as JSON: {}", kind, e);
            Value::Null
        });
        Self { kind, payload }
    }

    /// Payload decoded as `T`, or `None` if it does not have that shape.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        T::deserialize(&self.payload).ok()
    }

    /// Slice half of the action id (`counter` for `counter/increment`).
    pub fn slice(&self) -> &str {
        self.kind.split_once('/').map_or(self.kind.as_str(), |(slice, _)| slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_uses_type_field() {
        let action = Action::with_payload("counter/incrementByAmount", 5);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "counter/incrementByAmount", "payload": 5 }));
        assert_eq!(action.payload_as::<i64>(), Some(5));
        assert_eq!(action.slice(), "counter");
    }

    #[test]
    fn unrepresentable_payload_becomes_null() {
        let mut keyed = std::collections::HashMap::new();
        keyed.insert((1, 2), "pair");
        let action = Action::with_payload("counter/incrementByAmount", keyed);
        assert_eq!(action.payload, Value::Null);
        assert_eq!(action.kind, "counter/incrementByAmount");
    }

    #[test]
    fn mismatched_payload_decodes_to_none() {
        let action = Action::with_payload("counter/incrementByAmount", "five");
        assert_eq!(action.payload_as::<i64>(), None);
        assert_eq!(Action::new("counter/increment").payload_as::<i64>(), None);
    }
}
