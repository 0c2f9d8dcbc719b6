use std::collections::BTreeSet;

/// Primitive names every [`TypeMap`] starts with.
pub const BUILTIN_PRIMITIVES: [&str; 5] = ["string", "number", "boolean", "date", "any"];

/// The primitive that accepts any present value.
pub const ANY: &str = "any";

/// The set of type names a [`Schema::Primitive`][`crate::Schema::Primitive`]
/// may refer to.
///
/// Registration is additive; names are never removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeMap {
    names: BTreeSet<String>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` to the recognized primitives. Returns `false` if it was
    /// already known.
    pub fn register(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        Self {
            names: BUILTIN_PRIMITIVES.iter().map(|name| (*name).to_owned()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins() {
        let types = TypeMap::new();
        for name in BUILTIN_PRIMITIVES.iter() {
            assert!(types.contains(name));
        }

        assert!(!types.contains("Money"));
        assert!(!types.contains("undefined"));
        assert!(!types.contains("null"));
    }

    #[test]
    fn register_is_additive() {
        let mut types = TypeMap::new();
        assert!(types.register("Money"));
        assert!(!types.register("Money"));
        assert!(types.contains("Money"));
        assert_eq!(6, types.names().count());
    }
}
