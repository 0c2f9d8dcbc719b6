use crate::value::{format_date, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A conversion from one primitive type to another.
///
/// Returning `None` means this particular value cannot be converted (for
/// example `"abc"` as a number); the engine reports that as an incorrect
/// type rather than passing a sentinel through.
pub type Converter = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Two-level lookup of converters: source type name, then target type name.
#[derive(Clone)]
pub struct ConverterMap {
    converters: HashMap<String, HashMap<String, Converter>>,
}

impl ConverterMap {
    /// A map holding the built-in converters.
    pub fn new() -> Self {
        let mut map = Self::empty();

        map.register("string", "number", |v| v.as_str().and_then(parse_number).map(Value::Number));
        map.register("string", "boolean", |v| v.as_str().map(|s| Value::Bool(parse_bool(s))));
        map.register("string", "date", |v| v.as_str().and_then(parse_date).map(Value::Date));

        map.register("number", "string", |v| v.as_f64().map(|n| Value::String(format_number(n))));
        map.register("number", "boolean", |v| v.as_f64().map(|n| Value::Bool(n != 0.0 && !n.is_nan())));
        map.register("number", "date", |v| v.as_f64().and_then(epoch_millis).map(Value::Date));

        map.register("boolean", "string", |v| v.as_bool().map(|b| Value::String(b.to_string())));
        map.register("boolean", "number", |v| {
            v.as_bool().map(|b| Value::Number(if b { 1.0 } else { 0.0 }))
        });

        map.register("date", "string", |v| v.as_date().map(|d| Value::String(format_date(d))));
        map.register("date", "number", |v| {
            v.as_date().map(|d| Value::Number(d.timestamp_millis() as f64))
        });

        map
    }

    /// A map with no converters at all.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Inserts a converter, replacing any existing one for the same pair.
    pub fn register<F>(&mut self, from: impl Into<String>, to: impl Into<String>, converter: F)
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.converters
            .entry(from.into())
            .or_default()
            .insert(to.into(), Arc::new(converter));
    }

    pub fn get(&self, from: &str, to: &str) -> Option<&Converter> {
        self.converters.get(from).and_then(|targets| targets.get(to))
    }

    pub fn contains(&self, from: &str, to: &str) -> bool {
        self.get(from, to).is_some()
    }
}

impl Default for ConverterMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConverterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<_> = self
            .converters
            .iter()
            .flat_map(|(from, targets)| targets.keys().map(move |to| format!("{} -> {}", from, to)))
            .collect();
        pairs.sort();

        f.debug_struct("ConverterMap").field("converters", &pairs).finish()
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(s: &str) -> bool {
    let s = s.trim();
    !(s.is_empty() || s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("off"))
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"].iter() {
        if let Ok(date) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&date));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| Utc.from_utc_datetime(&date))
}

fn epoch_millis(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }

    Utc.timestamp_millis_opt(n.trunc() as i64).single()
}

/// Renders a number the way it would be written in JSON, without a trailing
/// `.0` for integers.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(map: &ConverterMap, value: Value, to: &str) -> Option<Value> {
        let converter = map.get(&value.type_name(), to).expect("converter registered");
        converter(&value)
    }

    #[test]
    fn string_to_number() {
        let map = ConverterMap::new();
        assert_eq!(Some(Value::Number(42.0)), convert(&map, "42".into(), "number"));
        assert_eq!(Some(Value::Number(-0.5)), convert(&map, " -0.5 ".into(), "number"));
        assert_eq!(None, convert(&map, "abc".into(), "number"));
        assert_eq!(None, convert(&map, "".into(), "number"));
        assert_eq!(None, convert(&map, "NaN".into(), "number"));
    }

    #[test]
    fn string_to_boolean() {
        let map = ConverterMap::new();
        assert_eq!(Some(Value::Bool(true)), convert(&map, "true".into(), "boolean"));
        assert_eq!(Some(Value::Bool(false)), convert(&map, "false".into(), "boolean"));
        assert_eq!(Some(Value::Bool(false)), convert(&map, "".into(), "boolean"));
        assert_eq!(Some(Value::Bool(false)), convert(&map, "off".into(), "boolean"));
        assert_eq!(Some(Value::Bool(true)), convert(&map, "on".into(), "boolean"));
    }

    #[test]
    fn string_to_date() {
        let map = ConverterMap::new();
        let midnight = Utc.with_ymd_and_hms(2021, 3, 4, 0, 0, 0).unwrap();

        assert_eq!(Some(Value::Date(midnight)), convert(&map, "2021-03-04".into(), "date"));
        assert_eq!(
            Some(Value::Date(midnight)),
            convert(&map, "2021-03-04T02:00:00+02:00".into(), "date")
        );
        assert_eq!(
            Some(Value::Date(midnight)),
            convert(&map, "2021-03-04T00:00:00".into(), "date")
        );
        assert_eq!(None, convert(&map, "yesterday".into(), "date"));
    }

    #[test]
    fn number_conversions() {
        let map = ConverterMap::new();
        assert_eq!(Some(Value::from("42")), convert(&map, 42.0.into(), "string"));
        assert_eq!(Some(Value::from("0.25")), convert(&map, 0.25.into(), "string"));
        assert_eq!(Some(Value::Bool(false)), convert(&map, 0.0.into(), "boolean"));
        assert_eq!(Some(Value::Bool(true)), convert(&map, 3.0.into(), "boolean"));
        assert_eq!(
            Some(Value::Date(Utc.timestamp_millis_opt(1_500).unwrap())),
            convert(&map, 1_500.0.into(), "date")
        );
    }

    #[test]
    fn boolean_and_date_conversions() {
        let map = ConverterMap::new();
        let date = Utc.timestamp_millis_opt(86_400_000).unwrap();

        assert_eq!(Some(Value::from("true")), convert(&map, true.into(), "string"));
        assert_eq!(Some(Value::Number(0.0)), convert(&map, false.into(), "number"));
        assert_eq!(Some(Value::Number(86_400_000.0)), convert(&map, date.into(), "number"));
        assert_eq!(
            Some(Value::from("1970-01-02T00:00:00.000Z")),
            convert(&map, date.into(), "string")
        );
    }

    #[test]
    fn register_overwrites() {
        let mut map = ConverterMap::empty();
        assert!(!map.contains("string", "number"));

        map.register("string", "number", |_| Some(Value::Number(1.0)));
        map.register("string", "number", |_| Some(Value::Number(2.0)));
        assert_eq!(Some(Value::Number(2.0)), convert(&map, "x".into(), "number"));
    }

    #[test]
    fn debug_lists_pairs() {
        let mut map = ConverterMap::empty();
        map.register("Money", "number", |_| None);
        assert_eq!(
            "ConverterMap { converters: [\"Money -> number\"] }",
            format!("{:?}", map)
        );
    }
}
