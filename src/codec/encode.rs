//! Schema-driven encoding of trusted values.
//!
//! Encoding never fails: values that do not match the schema pass through
//! unchanged. Exact objects drop keys they do not declare, which is how
//! internal-only fields are kept off the wire. Union variants are chosen
//! without regard to excess keys, since those are stripped anyway.

use serde_json::{Map, Value};

use crate::codec::decode::matches_ignoring_excess;
use crate::codec::schema::{ObjectMode, Schema};

/// Encode `value` for the wire according to `schema`.
pub fn encode(schema: &Schema, value: &Value) -> Value {
    match schema {
        Schema::NumberFromString => match value {
            Value::Number(n) => Value::String(n.to_string()),
            _ => value.clone(),
        },
        Schema::BooleanFromString => match value {
            Value::Bool(b) => Value::String(b.to_string()),
            _ => value.clone(),
        },
        Schema::Array(items) => match value {
            Value::Array(elements) => {
                Value::Array(elements.iter().map(|e| encode(items, e)).collect())
            }
            _ => value.clone(),
        },
        Schema::Record(values) => match value {
            Value::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), encode(values, v)))
                    .collect(),
            ),
            _ => value.clone(),
        },
        Schema::Object { fields, mode } => {
            let Value::Object(entries) = value else {
                return value.clone();
            };
            let mut out = Map::new();
            for field in fields {
                if let Some(v) = entries.get(&field.name) {
                    out.insert(field.name.clone(), encode(&field.schema, v));
                }
            }
            if *mode == ObjectMode::Open {
                for (key, v) in entries {
                    if !out.contains_key(key) {
                        out.insert(key.clone(), v.clone());
                    }
                }
            }
            Value::Object(out)
        }
        Schema::Union(variants) => variants
            .iter()
            .find(|variant| matches_ignoring_excess(variant, value))
            .map(|variant| encode(variant, value))
            .unwrap_or_else(|| value.clone()),
        Schema::Intersection(parts) => {
            if !value.is_object() {
                return parts
                    .first()
                    .map(|part| encode(part, value))
                    .unwrap_or_else(|| value.clone());
            }
            let mut merged = Map::new();
            for part in parts {
                if let Value::Object(map) = encode(part, value) {
                    merged.extend(map);
                }
            }
            Value::Object(merged)
        }
        Schema::Unknown
        | Schema::Null
        | Schema::String
        | Schema::Number
        | Schema::Integer
        | Schema::Boolean
        | Schema::Literal(_) => value.clone(),
    }
}
