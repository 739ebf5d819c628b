//! Error types for Kitty

use serde::Serialize;
use thiserror::Error;

/// Raw configuration text could not be turned into a flat mapping at all.
///
/// A decode error always short-circuits before binding, so the settings
/// tree is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed input at line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("Invalid structure: top level must be a mapping, found {found}")]
    InvalidStructure { found: String },

    #[error("Empty document")]
    EmptyDocument,

    #[error("Syntax error: {0}")]
    Syntax(String),
}

/// Why a single path could not be bound.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BindErrorKind {
    /// The string value could not be converted to the field's type.
    #[error("{cause}")]
    Field { cause: String },

    /// A pool record was complete but violated `core_size <= max_size`.
    #[error("core size {core_size} exceeds max size {max_size}")]
    RecordInvariant { core_size: usize, max_size: usize },
}

/// A recorded (never thrown) bind failure for one field or pool record.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{path}: {kind}")]
pub struct BindError {
    pub path: String,
    pub kind: BindErrorKind,
}

impl BindError {
    pub fn field(path: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: BindErrorKind::Field {
                cause: cause.into(),
            },
        }
    }

    pub fn record_invariant(path: impl Into<String>, core_size: usize, max_size: usize) -> Self {
        Self {
            path: path.into(),
            kind: BindErrorKind::RecordInvariant {
                core_size,
                max_size,
            },
        }
    }

    pub fn is_record_invariant(&self) -> bool {
        matches!(self.kind, BindErrorKind::RecordInvariant { .. })
    }
}

/// Main error type for Kitty
#[derive(Error, Debug)]
pub enum KittyError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Unknown config format: {0}")]
    UnknownFormat(String),

    #[error("Config source error: {0}")]
    Source(String),
}

/// Result type alias for Kitty operations
pub type Result<T> = std::result::Result<T, KittyError>;
