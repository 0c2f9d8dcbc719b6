use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// The keyed-object representation used by [`Value::Object`].
pub type Map = BTreeMap<String, Value>;

/// Largest integer magnitude an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// An untyped candidate value, as handed to (and returned by) a
/// [`Validator`][`crate::Validator`].
///
/// Absence is not a variant: a missing field is represented as `None`
/// wherever a value is optional, which keeps "absent" distinct from
/// [`Value::Null`].
///
/// ```
/// use shapecheck::Value;
/// use serde_json::json;
///
/// let value = Value::from(json!({ "tags": ["a", "b"] }));
/// assert_eq!("object", value.type_name());
/// assert_eq!("string[]", value.as_object().unwrap()["tags"].type_name());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Map),

    /// A value produced by a named constructor. Its type name is `tag`, and
    /// it behaves as a keyed object whenever its inner value is one.
    Tagged { tag: String, value: Box<Value> },
}

impl Value {
    pub fn tagged(tag: impl Into<String>, value: impl Into<Value>) -> Self {
        Value::Tagged {
            tag: tag.into(),
            value: Box::new(value.into()),
        }
    }

    /// The most specific type name of this value, as used for primitive
    /// matching and converter lookup.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_owned(),
            Value::Bool(_) => "boolean".to_owned(),
            Value::Number(_) => "number".to_owned(),
            Value::String(_) => "string".to_owned(),
            Value::Date(_) => "date".to_owned(),
            Value::Object(_) => "object".to_owned(),
            Value::Tagged { tag, .. } => tag.clone(),
            Value::Array(items) => {
                let mut names = items.iter().map(Value::type_name);
                match names.next() {
                    Some(first) if names.all(|name| name == first) => format!("{}[]", first),
                    _ => "any[]".to_owned(),
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            Value::Tagged { value, .. } => value.as_array(),
            _ => None,
        }
    }

    /// The keyed fields of this value, looking through any constructor tag.
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            Value::Tagged { value, .. } => value.as_object(),
            _ => None,
        }
    }

    /// Converts into plain JSON. Dates become RFC 3339 strings, tags are
    /// dropped, and non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(format_date(d)),
            Value::Array(items) => items.iter().map(Value::to_json).collect(),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Tagged { value, .. } => value.to_json(),
        }
    }
}

/// The type name of a possibly-absent value. Absent values report
/// `undefined`, which is never a registered primitive.
///
/// ```
/// use shapecheck::{type_name, Value};
///
/// assert_eq!("undefined", type_name(None));
/// assert_eq!("null", type_name(Some(&Value::Null)));
/// assert_eq!("Money", type_name(Some(&Value::tagged("Money", 4.0))));
/// ```
pub fn type_name(value: Option<&Value>) -> String {
    match value {
        Some(value) => value.type_name(),
        None => "undefined".to_owned(),
    }
}

pub(crate) fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_safe_integer(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
}

fn number_to_json(n: f64) -> serde_json::Value {
    if is_safe_integer(n) {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if is_safe_integer(*n) => serializer.serialize_i64(*n as i64),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.serialize_str(&format_date(d)),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(map) => serializer.collect_map(map),
            Value::Tagged { value, .. } => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn type_names() {
        assert_eq!("null", Value::Null.type_name());
        assert_eq!("boolean", Value::from(true).type_name());
        assert_eq!("number", Value::from(1.5).type_name());
        assert_eq!("string", Value::from("x").type_name());
        assert_eq!("date", Value::from(Utc.timestamp_millis_opt(0).unwrap()).type_name());
        assert_eq!("object", Value::from(json!({})).type_name());
        assert_eq!("Money", Value::tagged("Money", json!({ "cents": 5 })).type_name());
    }

    #[test]
    fn array_type_names() {
        assert_eq!("any[]", Value::from(json!([])).type_name());
        assert_eq!("number[]", Value::from(json!([1, 2, 3])).type_name());
        assert_eq!("any[]", Value::from(json!([1, "2"])).type_name());
        assert_eq!("number[][]", Value::from(json!([[1], [2]])).type_name());
    }

    #[test]
    fn tagged_values_look_through_to_fields() {
        let money = Value::tagged("Money", json!({ "cents": 5 }));
        assert_eq!(Some(&Value::Number(5.0)), money.as_object().unwrap().get("cents"));
        assert_eq!(json!({ "cents": 5 }), money.to_json());
    }

    #[test]
    fn json_interchange() {
        let date = Utc.timestamp_millis_opt(1_000).unwrap();
        let value = Value::Array(vec![Value::from(42.0), Value::from(0.5), Value::Date(date)]);

        assert_eq!(json!([42, 0.5, "1970-01-01T00:00:01.000Z"]), value.to_json());
        assert_eq!(
            "[42,0.5,\"1970-01-01T00:00:01.000Z\"]",
            serde_json::to_string(&value).unwrap()
        );
        assert_eq!(
            Value::from(json!({ "a": [1, null] })),
            serde_json::from_str::<Value>(r#"{"a":[1,null]}"#).unwrap()
        );
        assert_eq!(json!(null), Value::Number(f64::NAN).to_json());
    }
}
