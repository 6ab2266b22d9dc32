//! Error taxonomy for generation, loading and the runtime bridge.
//!
//! Generation errors are fatal for the whole pass: there is no partial bridge.
use thiserror::Error;

/// Failures of a generation pass. Every variant carries enough context
/// (kind, name, dotted path) to locate the offending schema in the contract source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenError {
    #[error("unsupported schema kind `{kind}` at {path}")]
    UnsupportedSchemaKind { kind: String, path: String },

    #[error("variant `{variant}` has {field_count} field(s) but its accessor flavor does not match")]
    InvalidVariantFlavor { variant: String, field_count: usize },

    #[error("contract is missing its required {0} type")]
    MissingRequiredType(&'static str),

    #[error("type name `{name}` is bound to two structurally different schemas (second seen at {path})")]
    NameCollision { name: String, path: String },

    #[error("duplicate field `{field}` in `{owner}`")]
    DuplicateFieldName { owner: String, field: String },

    #[error("schema nesting exceeds depth {depth} at {path}")]
    SchemaTooDeep { depth: usize, path: String },

    #[error("no primitive codec for `{name}` at {path}")]
    UnknownPrimitive { name: String, path: String },

    #[error("variant `{name}` at {path} has no parent enum{}", module_note(.module))]
    OrphanVariant { name: String, module: Option<String>, path: String },
}

/// Failures while encoding, decoding or constructing values through a bridge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("no registered type named `{0}`")]
    UnknownType(String),

    #[error("`{type_name}` has no variant `{variant}`")]
    UnknownVariant { type_name: String, variant: String },

    #[error("`{0}` is not an enum type")]
    NotAnEnum(String),

    #[error("variant `{variant}` is a {actual} accessor, not {expected}")]
    WrongAccessor {
        variant: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid value at {path}: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("cannot decode at {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("seed source produced no seed")]
    NoSeed,
}

fn module_note(module: &Option<String>) -> String {
    module.as_ref().map(|m| format!(" (module `{m}`)")).unwrap_or_default()
}

impl BridgeError {
    pub(crate) fn invalid(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue { path: path.to_string(), reason: reason.into() }
    }

    pub(crate) fn decode(path: &str, reason: impl Into<String>) -> Self {
        Self::Decode { path: path.to_string(), reason: reason.into() }
    }
}

/// Failures while reading contract schemas from JSON.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("at JSON path {path} → {message}")]
    Json { path: String, message: String },
}

pub type GenResult<T> = Result<T, GenError>;
pub type BridgeResult<T> = Result<T, BridgeError>;
