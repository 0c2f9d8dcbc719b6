//! A recursive schema validator.
//!
//! A [`Schema`] describes the shape of untyped data: primitives, arrays,
//! keyed hierarchies, dynamic maps, and `or`/`and` compounds, with
//! [`Meta`] nodes adding requirement, defaults and custom validators. A
//! [`Validator`] checks a [`Value`] against a schema and returns a new,
//! normalized value (converting near-matches such as `"42"` for a number),
//! or a [`ValidationError`] carrying the exact path of the first failure.
//!
//! ```
//! use shapecheck::{build, ErrorKind, Validator, Value};
//! use serde_json::json;
//!
//! let schema = build(&json!({
//!     "id": ["string", "or", "number"],
//!     "scores": ["number"],
//! }));
//! let validator = Validator::new();
//!
//! let model = validator
//!     .validate(&schema, &Value::from(json!({ "id": 7, "scores": ["1", 2] })))
//!     .unwrap();
//! assert_eq!(json!({ "id": 7, "scores": [1, 2] }), model.to_json());
//!
//! let err = validator
//!     .validate(&schema, &Value::from(json!({ "id": 7, "scores": [1, "x"] })))
//!     .unwrap_err();
//! assert_eq!(ErrorKind::IncorrectType, err.kind);
//! assert_eq!(vec!["scores", "1"], err.path);
//! ```

mod classify;
mod convert;
mod error;
mod schema;
mod type_map;
mod validate;
mod value;

pub use classify::*;
pub use convert::*;
pub use error::*;
pub use schema::*;
pub use type_map::*;
pub use validate::*;
pub use value::*;
