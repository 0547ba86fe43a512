//! Receipt payload and its on-chain encoding.
//!
//! The payload is an arbitrary JSON document. Before it is submitted it is
//! rendered as compact JSON with every object's keys sorted, so the same
//! receipt always produces the same `bytes` argument regardless of how the
//! producer ordered its fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque structured receipt (message, meeting, payment, consent, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptPayload(Value);

impl ReceiptPayload {
	pub fn new(value: Value) -> Self {
		Self(value)
	}

	pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(s).map(Self)
	}

	pub fn as_value(&self) -> &Value {
		&self.0
	}

	/// UTF-8 bytes of the sorted-key, compact JSON rendering.
	pub fn canonical_bytes(&self) -> Vec<u8> {
		canonicalize(&self.0).to_string().into_bytes()
	}

	/// `0x`-prefixed hex of [`Self::canonical_bytes`], two digits per byte.
	pub fn receipt_data_hex(&self) -> String {
		format!("0x{}", hex::encode(self.canonical_bytes()))
	}
}

impl From<Value> for ReceiptPayload {
	fn from(value: Value) -> Self {
		Self(value)
	}
}

fn canonicalize(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut entries: Vec<(&String, &Value)> = map.iter().collect();
			entries.sort_by(|a, b| a.0.cmp(b.0));

			let mut sorted = Map::with_capacity(entries.len());
			for (key, inner) in entries {
				sorted.insert(key.clone(), canonicalize(inner));
			}
			Value::Object(sorted)
		}
		Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
		other => other.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_keys_are_sorted_recursively() {
		let payload = ReceiptPayload::new(json!({
			"type": "payment",
			"amount": 12.5,
			"parties": [{"to": "bob", "from": "alice"}],
		}));

		assert_eq!(
			String::from_utf8(payload.canonical_bytes()).unwrap(),
			r#"{"amount":12.5,"parties":[{"from":"alice","to":"bob"}],"type":"payment"}"#
		);
	}

	#[test]
	fn test_field_order_does_not_change_encoding() {
		let a = ReceiptPayload::from_json_str(r#"{"b": 1, "a": {"y": true, "x": null}}"#).unwrap();
		let b = ReceiptPayload::from_json_str(r#"{"a": {"x": null, "y": true}, "b": 1}"#).unwrap();
		assert_eq!(a.canonical_bytes(), b.canonical_bytes());
	}

	#[test]
	fn test_hex_rendering() {
		let payload = ReceiptPayload::new(json!({"a": 1}));
		// {"a":1}
		assert_eq!(payload.receipt_data_hex(), "0x7b2261223a317d");
	}
}
