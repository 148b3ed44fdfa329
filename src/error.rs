//! Error types for schema conversion

use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Conversion errors.
///
/// Every schema-shape variant names the location it was raised at, using the
/// string form of the [`Reference`](crate::Reference) being converted.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("$ref at {path} is not a string")]
    RefNotString { path: String },

    #[error("Cannot resolve {reference}: {reason}")]
    UnresolvedRef { reference: String, reason: String },

    #[error("Definition '{name}' not found at {path}")]
    MissingDefinition { path: String, name: String },

    #[error("Invalid array index '{key}' at {path}")]
    InvalidIndex { path: String, key: String },

    #[error("Path element '{element}' in {reference} cannot address schema text")]
    Unaddressable { reference: String, element: String },

    #[error("Invalid type field at {path}: {reason}")]
    InvalidType { path: String, reason: String },

    #[error("Unknown type name '{name}' at {path}")]
    UnknownTypeName { path: String, name: String },

    #[error("Enum case at {path} is not a string: {case}")]
    InvalidEnum { path: String, case: String },

    #[error("Invalid required field at {path}: {reason}")]
    InvalidRequired { path: String, reason: String },

    #[error("Expected {expected} at {path}, found {found}")]
    ExpectedShape {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("Path {path} is already bound to a different type")]
    ConflictingBinding { path: String },

    #[error("Recursion limit of {limit} exceeded at {path}")]
    DepthExceeded { path: String, limit: usize },

    #[error("Document not found: {address}")]
    DocumentNotFound { address: String },

    #[error("Invalid document {address}: {reason}")]
    InvalidDocument { address: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl ConvertError {
    /// Shorthand for a wrong-JSON-shape failure
    pub(crate) fn expected(
        path: impl ToString,
        expected: &'static str,
        found: &serde_json::Value,
    ) -> Self {
        ConvertError::ExpectedShape {
            path: path.to_string(),
            expected,
            found: json_kind(found).to_string(),
        }
    }
}

/// JSON type name of a value, for error messages
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
