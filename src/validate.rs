use crate::convert::ConverterMap;
use crate::error::{ErrorKind, ValidationError};
use crate::schema::{Meta, Schema};
use crate::type_map::{TypeMap, ANY};
use crate::value::{Map, Value};
use tracing::{debug, trace};

#[derive(Clone, Debug)]
pub struct ValidateOptions {
    conversion: bool,
    max_depth: usize,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables converters for every validation. Compound schemas
    /// additionally disable them for their own alternatives.
    pub fn with_conversion(mut self, conversion: bool) -> Self {
        self.conversion = conversion;
        self
    }

    /// Bounds how deeply nested a schema may be traversed. Zero means no
    /// bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn conversion(&self) -> bool {
        self.conversion
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            conversion: true,
            max_depth: 0,
        }
    }
}

/// Validates values against schemas, converting and defaulting along the way.
///
/// A validator owns its primitive names and converters. Registration takes
/// `&mut self`, so a validator shared between threads (for example behind an
/// `Arc`) is necessarily fully configured before it is shared.
///
/// ```
/// use shapecheck::{build, Validator, Value};
/// use serde_json::json;
///
/// let schema = build(&json!({
///     "name": { "type": "string", "required": true },
///     "age": "number",
///     "motto": { "type": "string", "required": false, "default": "none" },
/// }));
///
/// let person = Validator::new()
///     .validate(&schema, &Value::from(json!({ "name": "Ada", "age": "36", "extra": 1 })))
///     .unwrap();
///
/// assert_eq!(json!({ "name": "Ada", "age": 36, "motto": "none" }), person.to_json());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Validator {
    types: TypeMap,
    converters: ConverterMap,
    options: ValidateOptions,
}

impl Validator {
    /// A validator with the built-in primitives and converters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn types(&self) -> &TypeMap {
        &self.types
    }

    pub fn converters(&self) -> &ConverterMap {
        &self.converters
    }

    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    /// Recognizes `name` as a primitive. Values whose type name equals it
    /// validate against `Schema::Primitive(name)` from now on.
    pub fn register_primitive(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        debug!(name = %name, "registering primitive");
        self.types.register(name);
        self
    }

    /// Registers (or replaces) the converter used when a `from` value meets a
    /// `to` schema.
    pub fn register_converter<F>(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        converter: F,
    ) -> &mut Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        let (from, to) = (from.into(), to.into());
        debug!(from = %from, to = %to, "registering converter");
        self.converters.register(from, to, converter);
        self
    }

    /// Validates `source` against `schema`, returning a new validated value.
    ///
    /// A schema that resolves to "absent" (an optional root with nothing
    /// usable) fails as missing; use [`Validator::resolve`] to accept that.
    pub fn validate(&self, schema: &Schema, source: &Value) -> Result<Value, ValidationError> {
        match self.resolve(schema, Some(source))? {
            Some(value) => Ok(value),
            None => Err(ValidationError::new(
                ErrorKind::Missing,
                vec![],
                schema.clone(),
                Some(source.clone()),
                schema.clone(),
                Some(source.clone()),
                None,
            )),
        }
    }

    /// Validates a possibly-absent `source`. `Ok(None)` means the schema
    /// accepts absence and supplied no default.
    pub fn resolve(
        &self,
        schema: &Schema,
        source: Option<&Value>,
    ) -> Result<Option<Value>, ValidationError> {
        let mut vm = Vm {
            validator: self,
            root_source: source,
            path: vec![],
            depth: 0,
        };

        let conversion = self.options.conversion && !schema.is_compound();
        vm.step(schema, source, conversion).map_err(|failure| {
            let err = failure.into_error(schema, source);
            debug!(kind = %err.kind, path = %err.path_string(), "validation failed");
            err
        })
    }

    /// Finds the first node of `schema` that describes nothing: an invalid
    /// literal or an unregistered primitive.
    pub fn check_schema(&self, schema: &Schema) -> Result<(), ValidationError> {
        let mut path = vec![];
        self.check_node(schema, &mut path, 0).map_err(|failure| failure.into_error(schema, None))
    }

    fn check_node<'s>(
        &self,
        schema: &'s Schema,
        path: &mut Vec<String>,
        depth: usize,
    ) -> Result<(), Failure<'s>> {
        let max_depth = self.options.max_depth;
        if max_depth != 0 && depth >= max_depth {
            return Err(Failure::new(ErrorKind::MaxDepthExceeded, path, schema, None));
        }

        match schema {
            Schema::Primitive(name) if self.types.contains(name) => Ok(()),
            Schema::Primitive(_) | Schema::Invalid(_) => {
                Err(Failure::new(ErrorKind::InvalidSchema, path, schema, None))
            }
            Schema::Meta(meta) => self.check_node(&meta.type_, path, depth + 1),
            Schema::Array(inner) | Schema::Dynamic(inner) => self.check_node(inner, path, depth + 1),
            Schema::Or(left, right) | Schema::And(left, right) => {
                self.check_node(left, path, depth + 1)?;
                self.check_node(right, path, depth + 1)
            }
            Schema::Hierarchy(fields) => {
                for (name, field) in fields {
                    path.push(name.clone());
                    let checked = self.check_node(field, path, depth + 1);
                    path.pop();
                    checked?;
                }

                Ok(())
            }
        }
    }
}

/// A failure inside the engine, before the root context is attached.
///
/// The failing node is borrowed; it is only cloned once the failure escapes
/// as a [`ValidationError`].
struct Failure<'s> {
    kind: ErrorKind,
    path: Vec<String>,
    schema: &'s Schema,
    data: Option<Value>,
    reason: Option<String>,
}

impl<'s> Failure<'s> {
    fn new(kind: ErrorKind, path: &[String], schema: &'s Schema, data: Option<&Value>) -> Self {
        Self {
            kind,
            path: path.to_vec(),
            schema,
            data: data.cloned(),
            reason: None,
        }
    }

    fn into_error(self, root_schema: &Schema, root_data: Option<&Value>) -> ValidationError {
        ValidationError::new(
            self.kind,
            self.path,
            self.schema.clone(),
            self.data,
            root_schema.clone(),
            root_data.cloned(),
            self.reason,
        )
    }
}

struct Vm<'a> {
    validator: &'a Validator,
    root_source: Option<&'a Value>,
    path: Vec<String>,
    depth: usize,
}

impl<'a> Vm<'a> {
    fn step<'s>(
        &mut self,
        schema: &'s Schema,
        value: Option<&Value>,
        conversion: bool,
    ) -> Result<Option<Value>, Failure<'s>> {
        let max_depth = self.validator.options.max_depth;
        if max_depth != 0 && self.depth >= max_depth {
            return Err(self.fail(ErrorKind::MaxDepthExceeded, schema, value));
        }

        self.depth += 1;
        let result = self.dispatch(schema, value, conversion);
        self.depth -= 1;

        result
    }

    fn dispatch<'s>(
        &mut self,
        schema: &'s Schema,
        value: Option<&Value>,
        conversion: bool,
    ) -> Result<Option<Value>, Failure<'s>> {
        match schema {
            Schema::Primitive(name) => self.validate_primitive(schema, name, value, conversion),
            Schema::Meta(meta) => self.validate_meta(schema, meta, value, conversion),
            Schema::Array(inner) => self.validate_array(schema, inner, value, conversion),
            Schema::Hierarchy(fields) => self.validate_hierarchy(schema, fields, value, conversion),
            Schema::Dynamic(inner) => self.validate_dynamic(schema, inner, value, conversion),
            Schema::Or(left, right) => match self.step(left, value, false) {
                Err(failure) if !failure.kind.is_fatal() => self.step(right, value, false),
                resolved => resolved,
            },
            Schema::And(left, right) => {
                let refined = self.step(right, value, conversion)?;

                // An optional left side that declines the value leaves the
                // right side's result standing.
                match self.step(left, refined.as_ref(), false)? {
                    Some(resolved) => Ok(Some(resolved)),
                    None => Ok(refined),
                }
            }
            Schema::Invalid(_) => Err(self.fail(ErrorKind::InvalidSchema, schema, value)),
        }
    }

    fn validate_primitive<'s>(
        &mut self,
        schema: &'s Schema,
        name: &str,
        value: Option<&Value>,
        conversion: bool,
    ) -> Result<Option<Value>, Failure<'s>> {
        if !self.validator.types.contains(name) {
            return Err(self.fail(ErrorKind::InvalidSchema, schema, value));
        }

        let value = match value {
            Some(value) => value,
            None => return Err(self.fail(ErrorKind::Missing, schema, None)),
        };

        let measured = value.type_name();
        if name == ANY || measured == name {
            return Ok(Some(value.clone()));
        }

        if conversion {
            if let Some(convert) = self.validator.converters.get(&measured, name) {
                return match convert(value) {
                    Some(converted) => {
                        trace!(from = %measured, to = %name, path = ?self.path, "converted value");
                        Ok(Some(converted))
                    }
                    None => Err(self.fail(ErrorKind::IncorrectType, schema, Some(value))),
                };
            }
        }

        Err(self.mismatch(schema, Some(value)))
    }

    fn validate_meta<'s>(
        &mut self,
        schema: &'s Schema,
        meta: &'s Meta,
        value: Option<&Value>,
        conversion: bool,
    ) -> Result<Option<Value>, Failure<'s>> {
        let checked;
        let value = match &meta.validator {
            Some(check) => match check(value.cloned(), self.root_source) {
                Ok(transformed) => {
                    checked = transformed;
                    checked.as_ref()
                }
                Err(reason) => {
                    let mut failure = self.fail(ErrorKind::FailedCustomValidator, schema, value);
                    failure.reason = Some(reason);
                    return Err(failure);
                }
            },
            None => value,
        };

        match self.step(&meta.type_, value, conversion) {
            Err(failure) if failure.kind.is_absorbable() => {
                if let Some(default) = &meta.default {
                    trace!(path = ?self.path, "substituting default");
                    let default = default.evaluate();
                    self.step(&meta.type_, Some(&default), conversion)
                } else if meta.required {
                    Err(failure)
                } else {
                    trace!(path = ?self.path, "omitting optional value");
                    Ok(None)
                }
            }
            resolved => resolved,
        }
    }

    fn validate_array<'s>(
        &mut self,
        schema: &'s Schema,
        inner: &'s Schema,
        value: Option<&Value>,
        conversion: bool,
    ) -> Result<Option<Value>, Failure<'s>> {
        let items = match value.and_then(Value::as_array) {
            Some(items) => items,
            None => return Err(self.mismatch(schema, value)),
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            self.push_path_token(&i.to_string());
            let resolved = self.step(inner, Some(item), conversion);
            self.pop_path_token();

            if let Some(item) = resolved? {
                out.push(item);
            }
        }

        Ok(Some(Value::Array(out)))
    }

    fn validate_hierarchy<'s>(
        &mut self,
        schema: &'s Schema,
        fields: &'s [(String, Schema)],
        value: Option<&Value>,
        conversion: bool,
    ) -> Result<Option<Value>, Failure<'s>> {
        let obj = match value.and_then(Value::as_object) {
            Some(obj) => obj,
            None => return Err(self.mismatch(schema, value)),
        };

        let mut out = Map::new();
        for (name, field) in fields {
            self.push_path_token(name);
            let resolved = self.step(field, obj.get(name), conversion);
            self.pop_path_token();

            if let Some(field_value) = resolved? {
                out.insert(name.clone(), field_value);
            }
        }

        Ok(Some(Value::Object(out)))
    }

    fn validate_dynamic<'s>(
        &mut self,
        schema: &'s Schema,
        inner: &'s Schema,
        value: Option<&Value>,
        conversion: bool,
    ) -> Result<Option<Value>, Failure<'s>> {
        let obj = match value.and_then(Value::as_object) {
            Some(obj) => obj,
            None => return Err(self.mismatch(schema, value)),
        };

        let mut out = Map::new();
        for (name, sub_value) in obj {
            self.push_path_token(name);
            let resolved = self.step(inner, Some(sub_value), conversion);
            self.pop_path_token();

            if let Some(sub_value) = resolved? {
                out.insert(name.clone(), sub_value);
            }
        }

        Ok(Some(Value::Object(out)))
    }

    /// `Missing` for absent or null values, `IncorrectType` otherwise.
    fn mismatch<'s>(&self, schema: &'s Schema, value: Option<&Value>) -> Failure<'s> {
        match value {
            None | Some(Value::Null) => self.fail(ErrorKind::Missing, schema, value),
            Some(_) => self.fail(ErrorKind::IncorrectType, schema, value),
        }
    }

    fn fail<'s>(&self, kind: ErrorKind, schema: &'s Schema, value: Option<&Value>) -> Failure<'s> {
        Failure::new(kind, &self.path, schema, value)
    }

    fn push_path_token(&mut self, token: &str) {
        self.path.push(token.to_owned());
    }

    fn pop_path_token(&mut self) {
        self.path.pop();
    }
}
