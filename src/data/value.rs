use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::error::{Result, WconError};

// ---------------------------------------------------------------------------
// Value – the opaque decoded tree
// ---------------------------------------------------------------------------

/// An untyped JSON tree. Used for metadata, passthrough keys and as the
/// input to segment normalization. Compared structurally, except that
/// numbers compare by value: `1` equals `1.0`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Short type name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "<{}>", self.kind()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decoded tree that still keeps every key/value pair in source order, so
/// repeated keys survive until [`RawValue::into_checked`] rejects them.
enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<RawValue>),
    Object(Vec<(String, RawValue)>),
}

struct RawVisitor;

impl<'de> Visitor<'de> for RawVisitor {
    type Value = RawValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<RawValue, E> {
        Ok(RawValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<RawValue, E> {
        Ok(RawValue::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<RawValue, E> {
        Ok(RawValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<RawValue, E> {
        Ok(RawValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<RawValue, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => RawValue::Integer(i),
            Err(_) => RawValue::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<RawValue, E> {
        Ok(RawValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<RawValue, E> {
        Ok(RawValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<RawValue, E> {
        Ok(RawValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<RawValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<RawValue>()? {
            items.push(item);
        }
        Ok(RawValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RawValue, A::Error> {
        let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, RawValue>()? {
            pairs.push((key, value));
        }
        Ok(RawValue::Object(pairs))
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(RawVisitor)
    }
}

impl RawValue {
    fn into_checked(self, path: &str) -> Result<Value> {
        Ok(match self {
            RawValue::Null => Value::Null,
            RawValue::Bool(b) => Value::Bool(b),
            RawValue::Integer(i) => Value::Integer(i),
            RawValue::Float(v) => Value::Float(v),
            RawValue::String(s) => Value::String(s),
            RawValue::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| item.into_checked(&format!("{path}[{i}]")))
                    .collect::<Result<_>>()?,
            ),
            RawValue::Object(pairs) => {
                let mut map = BTreeMap::new();
                for (key, value) in pairs {
                    if map.contains_key(&key) {
                        return Err(WconError::DuplicateKey {
                            key,
                            path: path.to_string(),
                        });
                    }
                    let child = value.into_checked(&format!("{path}.{key}"))?;
                    map.insert(key, child);
                }
                Value::Object(map)
            }
        })
    }
}

/// Decode JSON text into a [`Value`], rejecting repeated keys in any object
/// at any depth.
pub fn decode(text: &str) -> Result<Value> {
    let raw: RawValue = serde_json::from_str(text)?;
    raw.into_checked("$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_nested_tree() {
        let v = decode(r#"{"a": [1, 2.5, "s", null, true], "b": {"c": -3}}"#).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(
            obj["a"],
            Value::Array(vec![
                Value::Integer(1),
                Value::Float(2.5),
                Value::String("s".into()),
                Value::Null,
                Value::Bool(true),
            ])
        );
        assert_eq!(obj["b"].as_object().unwrap()["c"], Value::Integer(-3));
    }

    #[test]
    fn integers_and_floats_compare_by_value() {
        assert_eq!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Integer(1), Value::Float(1.5));
        assert_ne!(Value::Integer(1), Value::String("1".into()));
        assert_eq!(
            decode(r#"{"v":[1,{"w":2}]}"#).unwrap(),
            decode(r#"{"v":[1.0,{"w":2.0}]}"#).unwrap()
        );
    }

    #[test]
    fn rejects_top_level_duplicate() {
        let err = decode(r#"{"units": {}, "units": {}}"#).unwrap_err();
        assert!(
            matches!(err, WconError::DuplicateKey { key, path } if key == "units" && path == "$")
        );
    }

    #[test]
    fn rejects_nested_duplicate_with_path() {
        let err = decode(r#"{"data": [{"id": 1, "t": 0, "x": [1], "x": [2]}]}"#).unwrap_err();
        match err {
            WconError::DuplicateKey { key, path } => {
                assert_eq!(key, "x");
                assert_eq!(path, "$.data[0]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn syntax_errors_surface_as_json() {
        assert!(matches!(decode("{\"a\": }"), Err(WconError::Json(_))));
    }

    #[test]
    fn serializes_back_to_json() {
        let v = decode(r#"{"b": [1, 2], "a": "x"}"#).unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"a":"x","b":[1,2]}"#);
    }
}
