//! Classification of schema literals.
//!
//! A schema literal is plain JSON. Its variant is decided purely by shape:
//!
//! | literal                                   | variant     |
//! |-------------------------------------------|-------------|
//! | `"number"`                                | primitive   |
//! | `[a, "or", b]`                            | or          |
//! | `[a, "and", b]`                           | and         |
//! | `[a]`                                     | array       |
//! | `{ "type": a, "required": true, ... }`    | meta        |
//! | `{ "$dynamic": a }`                       | dynamic     |
//! | `{ "x": a, "y": b }`                      | hierarchy   |
//!
//! Compounds are recognized before arrays, and meta and dynamic objects before
//! hierarchies, so a hierarchy can never capture either of them.

use crate::schema::{DefaultValue, Meta, Schema, DYNAMIC_KEY};
use crate::value::Value;
use serde_json::Value as Literal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Primitive,
    Meta,
    Array,
    Hierarchy,
    Dynamic,
    Or,
    And,
}

/// Determines which variant `literal` describes, or `None` if it (or any
/// literal nested in it) describes nothing.
pub fn classify(literal: &Literal) -> Option<LiteralKind> {
    let kind = shape(literal)?;
    let nested_valid = match (kind, literal) {
        (LiteralKind::Or, Literal::Array(items)) | (LiteralKind::And, Literal::Array(items)) => {
            is_schema(&items[0]) && is_schema(&items[2])
        }
        (LiteralKind::Array, Literal::Array(items)) => is_schema(&items[0]),
        (LiteralKind::Meta, Literal::Object(fields)) => fields.get("type").map_or(false, is_schema),
        (LiteralKind::Dynamic, Literal::Object(fields)) => {
            fields.get(DYNAMIC_KEY).map_or(false, is_schema)
        }
        (LiteralKind::Hierarchy, Literal::Object(fields)) => fields.values().all(is_schema),
        _ => true,
    };

    if nested_valid {
        Some(kind)
    } else {
        None
    }
}

/// The variant `literal` has the shape of, without looking at nested
/// literals.
fn shape(literal: &Literal) -> Option<LiteralKind> {
    match literal {
        Literal::String(_) => Some(LiteralKind::Primitive),
        Literal::Array(items) => compound_kind(items).or(if items.len() == 1 {
            Some(LiteralKind::Array)
        } else {
            None
        }),
        Literal::Object(fields) => {
            if fields.get("required").map_or(false, Literal::is_boolean) && fields.contains_key("type") {
                Some(LiteralKind::Meta)
            } else if fields.len() == 1 && fields.contains_key(DYNAMIC_KEY) {
                Some(LiteralKind::Dynamic)
            } else {
                Some(LiteralKind::Hierarchy)
            }
        }
        _ => None,
    }
}

fn compound_kind(items: &[Literal]) -> Option<LiteralKind> {
    if items.len() != 3 {
        return None;
    }

    match items[1].as_str() {
        Some("or") => Some(LiteralKind::Or),
        Some("and") => Some(LiteralKind::And),
        _ => None,
    }
}

pub fn is_primitive(literal: &Literal) -> bool {
    classify(literal) == Some(LiteralKind::Primitive)
}

pub fn is_meta(literal: &Literal) -> bool {
    classify(literal) == Some(LiteralKind::Meta)
}

pub fn is_array(literal: &Literal) -> bool {
    classify(literal) == Some(LiteralKind::Array)
}

pub fn is_hierarchy(literal: &Literal) -> bool {
    classify(literal) == Some(LiteralKind::Hierarchy)
}

pub fn is_dynamic(literal: &Literal) -> bool {
    classify(literal) == Some(LiteralKind::Dynamic)
}

pub fn is_or(literal: &Literal) -> bool {
    classify(literal) == Some(LiteralKind::Or)
}

pub fn is_and(literal: &Literal) -> bool {
    classify(literal) == Some(LiteralKind::And)
}

pub fn is_schema(literal: &Literal) -> bool {
    classify(literal).is_some()
}

/// Builds a [`Schema`] from its literal form.
///
/// This never fails. Each node is built from its own shape, and a literal
/// with no recognizable shape becomes [`Schema::Invalid`] in place, which is
/// reported when validation reaches it (or up front by
/// [`Validator::check_schema`][`crate::Validator::check_schema`]).
///
/// ```
/// use shapecheck::{build, is_schema, Schema};
/// use serde_json::json;
///
/// let schema = build(&json!({ "id": ["string", "or", "number"] }));
/// assert!(matches!(schema, Schema::Hierarchy(_)));
///
/// let literal = json!(["number", "xor", "string"]);
/// assert!(!is_schema(&literal));
/// assert!(matches!(build(&literal), Schema::Invalid(_)));
/// ```
pub fn build(literal: &Literal) -> Schema {
    let kind = match shape(literal) {
        Some(kind) => kind,
        None => return Schema::Invalid(literal.clone()),
    };

    match (kind, literal) {
        (LiteralKind::Primitive, Literal::String(name)) => Schema::Primitive(name.clone()),
        (LiteralKind::Or, Literal::Array(items)) => Schema::or(build(&items[0]), build(&items[2])),
        (LiteralKind::And, Literal::Array(items)) => Schema::and(build(&items[0]), build(&items[2])),
        (LiteralKind::Array, Literal::Array(items)) => Schema::array(build(&items[0])),
        (LiteralKind::Meta, Literal::Object(fields)) => {
            let type_ = fields
                .get("type")
                .map(build)
                .unwrap_or_else(|| Schema::Invalid(Literal::Null));
            let required = fields.get("required").and_then(Literal::as_bool).unwrap_or(false);

            let mut meta = Meta::new(type_, required);
            meta.default = fields
                .get("default")
                .map(|default| DefaultValue::Literal(Value::from(default.clone())));

            Schema::Meta(meta)
        }
        (LiteralKind::Dynamic, Literal::Object(fields)) => match fields.get(DYNAMIC_KEY) {
            Some(inner) => Schema::dynamic(build(inner)),
            None => Schema::Invalid(literal.clone()),
        },
        (LiteralKind::Hierarchy, Literal::Object(fields)) => {
            Schema::hierarchy(fields.iter().map(|(name, field)| (name.clone(), build(field))))
        }
        _ => Schema::Invalid(literal.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_variants() {
        assert_eq!(Some(LiteralKind::Primitive), classify(&json!("number")));
        assert_eq!(Some(LiteralKind::Array), classify(&json!(["number"])));
        assert_eq!(Some(LiteralKind::Or), classify(&json!(["string", "or", "number"])));
        assert_eq!(Some(LiteralKind::And), classify(&json!(["string", "and", "any"])));
        assert_eq!(Some(LiteralKind::Dynamic), classify(&json!({ "$dynamic": "number" })));
        assert_eq!(
            Some(LiteralKind::Meta),
            classify(&json!({ "type": "string", "required": false }))
        );
        assert_eq!(Some(LiteralKind::Hierarchy), classify(&json!({ "a": "string" })));
        assert_eq!(Some(LiteralKind::Hierarchy), classify(&json!({})));
    }

    #[test]
    fn compounds_before_arrays() {
        assert!(is_or(&json!(["string", "or", "string"])));
        assert!(!is_array(&json!(["string", "or", "string"])));
        assert!(!is_schema(&json!(["string", "xor", "number"])));
        assert!(!is_schema(&json!(["string", "number"])));
        assert!(!is_schema(&json!([])));
    }

    #[test]
    fn meta_before_hierarchy() {
        let literal = json!({ "type": "string", "required": true });
        assert!(is_meta(&literal));
        assert!(!is_hierarchy(&literal));

        // A non-boolean `required` makes this a hierarchy of two primitives.
        let literal = json!({ "type": "string", "required": "boolean" });
        assert!(is_hierarchy(&literal));
        assert!(!is_meta(&literal));

        assert!(!is_schema(&json!({ "type": 5, "required": true })));
    }

    #[test]
    fn nested_invalid_literals() {
        assert!(!is_schema(&json!({ "a": { "b": [1] } })));
        assert!(!is_schema(&json!(["string", "or", 5])));
        assert!(!is_schema(&json!({ "$dynamic": null })));
        assert!(!is_schema(&json!(null)));
        assert!(!is_schema(&json!(3)));
        assert!(is_dynamic(&json!({ "$dynamic": { "x": "number" } })));
        assert!(is_primitive(&json!("Money")));
    }

    #[test]
    fn build_meta_with_default() {
        let schema = build(&json!({ "type": "string", "required": true, "default": "N/A" }));
        match schema {
            Schema::Meta(meta) => {
                assert!(meta.required);
                assert!(matches!(*meta.type_, Schema::Primitive(ref name) if name == "string"));
                assert_eq!(Value::from("N/A"), meta.default.unwrap().evaluate());
            }
            other => panic!("expected meta, got {:?}", other),
        }
    }

    #[test]
    fn build_keeps_declaration_order() {
        let schema = build(&json!({ "z": "number", "a": "string", "m": ["date"] }));
        match schema {
            Schema::Hierarchy(fields) => {
                let names: Vec<_> = fields.iter().map(|(name, _)| name.as_str()).collect();
                assert_eq!(vec!["z", "a", "m"], names);
            }
            other => panic!("expected hierarchy, got {:?}", other),
        }
    }

    #[test]
    fn build_marks_invalid_subtrees() {
        match build(&json!(["string", "or", 5])) {
            Schema::Or(left, right) => {
                assert!(matches!(*left, Schema::Primitive(_)));
                assert!(matches!(*right, Schema::Invalid(_)));
            }
            other => panic!("expected or, got {:?}", other),
        }

        match build(&json!({ "type": 5, "required": true })) {
            Schema::Meta(meta) => assert!(matches!(*meta.type_, Schema::Invalid(_))),
            other => panic!("expected meta, got {:?}", other),
        }

        assert!(matches!(build(&json!(42)), Schema::Invalid(_)));
        assert!(matches!(build(&json!([])), Schema::Invalid(_)));
    }
}
