use crate::schema::Schema;
use crate::value::Value;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Longest compact rendering of an offending value kept in a message.
const MAX_DISPLAY_LEN: usize = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// A value was absent (or null) where one is required, with no usable
    /// default.
    Missing,

    /// A value was present but neither matched nor converted.
    IncorrectType,

    /// The schema itself describes nothing. Never absorbed by defaults or
    /// optionality.
    InvalidSchema,

    /// A custom validator rejected the value.
    FailedCustomValidator,

    /// The schema nests deeper than the configured limit.
    MaxDepthExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Missing => "missing",
            ErrorKind::IncorrectType => "incorrect-type",
            ErrorKind::InvalidSchema => "invalid-schema",
            ErrorKind::FailedCustomValidator => "failed-custom-validator",
            ErrorKind::MaxDepthExceeded => "max-depth-exceeded",
        }
    }

    /// Fatal kinds describe the schema or the validator, not the data, and
    /// abort validation wherever they occur.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::InvalidSchema | ErrorKind::MaxDepthExceeded)
    }

    /// Whether a meta node may replace this failure with its default or omit
    /// the value.
    pub(crate) fn is_absorbable(&self) -> bool {
        matches!(self, ErrorKind::Missing | ErrorKind::IncorrectType)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed validation.
///
/// The structured fields are the stable interface; the `Display` message is
/// meant for people and may change.
///
/// ```
/// use shapecheck::{build, ErrorKind, Validator, Value};
/// use serde_json::json;
///
/// let schema = build(&json!({ "a": { "b": { "type": "number", "required": true } } }));
/// let err = Validator::new()
///     .validate(&schema, &Value::from(json!({ "a": { "b": {} } })))
///     .unwrap_err();
///
/// assert_eq!(ErrorKind::IncorrectType, err.kind);
/// assert_eq!(vec!["a", "b"], err.path);
/// assert_eq!(
///     "field \"a.b\" has the wrong type: expected number, got object {}",
///     err.to_string()
/// );
/// ```
#[derive(Clone, Debug, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ErrorKind,

    /// Field names and array indices from the root to the offending value.
    pub path: Vec<String>,

    /// The schema node that failed.
    pub schema: Schema,

    /// The offending value; `None` when it was absent.
    pub data: Option<Value>,

    pub root_schema: Schema,
    pub root_data: Option<Value>,

    /// The rejection reason given by a custom validator.
    pub reason: Option<String>,

    message: String,
}

impl ValidationError {
    pub fn new(
        kind: ErrorKind,
        path: Vec<String>,
        schema: Schema,
        data: Option<Value>,
        root_schema: Schema,
        root_data: Option<Value>,
        reason: Option<String>,
    ) -> Self {
        let message = synthesize(kind, &path, &schema, data.as_ref(), reason.as_deref());

        Self {
            kind,
            path,
            schema,
            data,
            root_schema,
            root_data,
            reason,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The path joined with dots, e.g. `contact.emails.2`.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

fn synthesize(
    kind: ErrorKind,
    path: &[String],
    schema: &Schema,
    data: Option<&Value>,
    reason: Option<&str>,
) -> String {
    let location = if path.is_empty() {
        "value".to_owned()
    } else {
        format!("field \"{}\"", path.join("."))
    };

    match kind {
        ErrorKind::Missing if path.is_empty() => format!(
            "attempted to validate {} as {}",
            compact(data),
            schema.describe()
        ),
        ErrorKind::Missing => format!("missing required field \"{}\"", path.join(".")),
        ErrorKind::IncorrectType => format!(
            "{} has the wrong type: expected {}, got {}",
            location,
            schema.describe(),
            measured(data)
        ),
        ErrorKind::InvalidSchema => {
            format!("invalid schema for {}: {}", location, schema.to_literal())
        }
        ErrorKind::FailedCustomValidator => format!(
            "{} failed custom validation: {}",
            location,
            reason.unwrap_or("rejected")
        ),
        ErrorKind::MaxDepthExceeded => format!("maximum schema depth exceeded at {}", location),
    }
}

/// The type name of `data`, followed by its compact form unless the two
/// read the same (as for `null`).
fn measured(data: Option<&Value>) -> String {
    let name = crate::value::type_name(data);
    let shown = compact(data);
    if shown == name {
        name
    } else {
        format!("{} {}", name, shown)
    }
}

fn compact(data: Option<&Value>) -> String {
    let shown = match data {
        Some(value) => value.to_string(),
        None => return "undefined".to_owned(),
    };

    if shown.chars().count() <= MAX_DISPLAY_LEN {
        shown
    } else {
        let truncated: String = shown.chars().take(MAX_DISPLAY_LEN).collect();
        format!("{}...", truncated)
    }
}
