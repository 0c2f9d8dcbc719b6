use crate::classify::build;
use crate::value::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Key marking a dynamic-map schema in literal form: `{ "$dynamic": <schema> }`.
pub const DYNAMIC_KEY: &str = "$dynamic";

/// A refinement attached to a [`Meta`] node.
///
/// It receives the candidate value (`None` when absent) and the original
/// top-level source, and returns the value validation should continue with,
/// or a reason for rejecting it.
pub type CustomValidator =
    Arc<dyn Fn(Option<Value>, Option<&Value>) -> Result<Option<Value>, String> + Send + Sync>;

/// A lazily evaluated default.
pub type Producer = Arc<dyn Fn() -> Value + Send + Sync>;

/// The value a [`Meta`] node falls back to when its inner schema fails.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(Producer),
}

impl DefaultValue {
    pub fn evaluate(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Requirement, default and refinement wrapped around an inner schema.
#[derive(Clone)]
pub struct Meta {
    pub type_: Box<Schema>,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub validator: Option<CustomValidator>,
}

impl Meta {
    pub fn new(type_: impl Into<Schema>, required: bool) -> Self {
        Self {
            type_: Box::new(type_.into()),
            required,
            default: None,
            validator: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(default.into()));
        self
    }

    pub fn with_default_fn<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(produce)));
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(Option<Value>, Option<&Value>) -> Result<Option<Value>, String>
            + Send
            + Sync
            + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("type_", &self.type_)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .finish()
    }
}

/// A node of a schema.
///
/// Schemas are plain data: building one never fails, and a node that does
/// not describe anything ([`Schema::Invalid`], or a primitive whose name is
/// not registered) is only reported when a [`Validator`][`crate::Validator`]
/// reaches it.
///
/// ```
/// use shapecheck::{Meta, Schema};
///
/// let person = Schema::hierarchy(vec![
///     ("name", Meta::new("string", true).into()),
///     ("tags", Schema::array("string")),
///     ("motto", Meta::new("string", false).with_default("none").into()),
/// ]);
///
/// assert_eq!("object", person.describe());
/// assert!(person.is_required());
/// ```
#[derive(Clone, Debug)]
pub enum Schema {
    Primitive(String),
    Meta(Meta),
    Array(Box<Schema>),

    /// Declared fields, in declaration order.
    Hierarchy(Vec<(String, Schema)>),

    Dynamic(Box<Schema>),
    Or(Box<Schema>, Box<Schema>),
    And(Box<Schema>, Box<Schema>),

    /// A literal that classifies as none of the other variants.
    Invalid(serde_json::Value),
}

impl Schema {
    pub fn primitive(name: impl Into<String>) -> Self {
        Schema::Primitive(name.into())
    }

    pub fn array(inner: impl Into<Schema>) -> Self {
        Schema::Array(Box::new(inner.into()))
    }

    pub fn dynamic(inner: impl Into<Schema>) -> Self {
        Schema::Dynamic(Box::new(inner.into()))
    }

    pub fn hierarchy<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::Hierarchy(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn or(left: impl Into<Schema>, right: impl Into<Schema>) -> Self {
        Schema::Or(Box::new(left.into()), Box::new(right.into()))
    }

    pub fn and(left: impl Into<Schema>, right: impl Into<Schema>) -> Self {
        Schema::And(Box::new(left.into()), Box::new(right.into()))
    }

    pub fn required(inner: impl Into<Schema>) -> Self {
        Meta::new(inner, true).into()
    }

    pub fn optional(inner: impl Into<Schema>) -> Self {
        Meta::new(inner, false).into()
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Schema::Or(..) | Schema::And(..))
    }

    /// Whether validating an absent value against this schema fails.
    ///
    /// Custom validators are not consulted, since they may synthesize a value
    /// from nothing.
    pub fn is_required(&self) -> bool {
        match self {
            Schema::Meta(meta) => meta.default.is_none() && meta.required && meta.type_.is_required(),
            Schema::Or(left, right) => left.is_required() && right.is_required(),
            Schema::And(left, right) => left.is_required() || right.is_required(),
            _ => true,
        }
    }

    /// A compact rendering of the shape this schema expects.
    pub fn describe(&self) -> String {
        match self {
            Schema::Primitive(name) => name.clone(),
            Schema::Meta(meta) => meta.type_.describe(),
            Schema::Array(inner) if inner.is_compound() => format!("({})[]", inner.describe()),
            Schema::Array(inner) => format!("{}[]", inner.describe()),
            Schema::Hierarchy(_) => "object".to_owned(),
            Schema::Dynamic(inner) => format!("{{[key]: {}}}", inner.describe()),
            Schema::Or(left, right) => format!("{} | {}", left.describe(), right.describe()),
            Schema::And(left, right) => format!("{} & {}", left.describe(), right.describe()),
            Schema::Invalid(literal) => literal.to_string(),
        }
    }

    /// Renders this schema back into its literal form.
    ///
    /// Producer defaults and custom validators have no literal form and are
    /// left out.
    pub fn to_literal(&self) -> serde_json::Value {
        use serde_json::{json, Map};

        match self {
            Schema::Primitive(name) => serde_json::Value::String(name.clone()),
            Schema::Meta(meta) => {
                let mut out = Map::new();
                out.insert("type".to_owned(), meta.type_.to_literal());
                out.insert("required".to_owned(), serde_json::Value::Bool(meta.required));
                if let Some(DefaultValue::Literal(value)) = &meta.default {
                    out.insert("default".to_owned(), value.to_json());
                }

                serde_json::Value::Object(out)
            }
            Schema::Array(inner) => json!([inner.to_literal()]),
            Schema::Hierarchy(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.to_literal()))
                    .collect(),
            ),
            Schema::Dynamic(inner) => {
                let mut out = Map::new();
                out.insert(DYNAMIC_KEY.to_owned(), inner.to_literal());
                serde_json::Value::Object(out)
            }
            Schema::Or(left, right) => json!([left.to_literal(), "or", right.to_literal()]),
            Schema::And(left, right) => json!([left.to_literal(), "and", right.to_literal()]),
            Schema::Invalid(literal) => literal.clone(),
        }
    }
}

impl From<&str> for Schema {
    fn from(name: &str) -> Self {
        Schema::Primitive(name.to_owned())
    }
}

impl From<String> for Schema {
    fn from(name: String) -> Self {
        Schema::Primitive(name)
    }
}

impl From<Meta> for Schema {
    fn from(meta: Meta) -> Self {
        Schema::Meta(meta)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_literal().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(|literal| build(&literal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describe() {
        assert_eq!("number", Schema::from("number").describe());
        assert_eq!("string[]", Schema::array("string").describe());
        assert_eq!("(string | number)[]", Schema::array(Schema::or("string", "number")).describe());
        assert_eq!("{[key]: boolean}", Schema::dynamic("boolean").describe());
        assert_eq!("date & string", Schema::and("date", "string").describe());
        assert_eq!("number", Schema::required("number").describe());
    }

    #[test]
    fn is_required() {
        assert!(Schema::from("string").is_required());
        assert!(Schema::required("string").is_required());
        assert!(!Schema::optional("string").is_required());
        assert!(!Schema::Meta(Meta::new("string", true).with_default("x")).is_required());
        assert!(!Schema::required(Schema::optional("string")).is_required());
        assert!(!Schema::or("number", Schema::optional("string")).is_required());
        assert!(Schema::and(Schema::optional("string"), "string").is_required());
    }

    #[test]
    fn to_literal() {
        let schema = Schema::hierarchy(vec![
            ("name", Schema::required("string")),
            ("motto", Meta::new("string", false).with_default("none").into()),
            ("later", Meta::new("date", false).with_default_fn(|| Value::Null).into()),
            ("scores", Schema::dynamic(Schema::array("number"))),
            ("id", Schema::or("string", "number")),
        ]);

        assert_eq!(
            json!({
                "name": { "type": "string", "required": true },
                "motto": { "type": "string", "required": false, "default": "none" },
                "later": { "type": "date", "required": false },
                "scores": { "$dynamic": ["number"] },
                "id": ["string", "or", "number"],
            }),
            schema.to_literal()
        );
    }

    #[test]
    fn serde_round_trip() {
        let literal = json!({
            "a": ["number"],
            "b": { "type": ["string", "and", "any"], "required": true },
        });

        let schema: Schema = serde_json::from_value(literal.clone()).unwrap();
        assert_eq!(literal, serde_json::to_value(&schema).unwrap());
    }

    #[test]
    fn producer_default_is_lazy() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let meta = Meta::new("number", true).with_default_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Number(7.0)
        });

        assert_eq!(0, calls.load(Ordering::SeqCst));
        assert_eq!(Value::Number(7.0), meta.default.as_ref().unwrap().evaluate());
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }
}
