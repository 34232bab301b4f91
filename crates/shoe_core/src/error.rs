//! Shoe error types

use thiserror::Error;

/// Errors raised by the value algebra and the animation engine.
///
/// Every variant except [`ShoeError::Render`] is a contract violation by the
/// calling code. The engine never recovers from these internally; they are
/// returned to whoever triggered the operation.
#[derive(Error, Debug)]
pub enum ShoeError {
    /// A value type was asked for an operation it does not implement
    #[error("value type must implement {method}")]
    NotImplemented { method: &'static str },

    /// A value type received a value of the wrong shape
    #[error("{operation}: expected {expected} value, found {found}")]
    TypeMismatch {
        operation: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// An array value does not match its value type's fixed length
    #[error("array value has {found} elements, value type requires exactly {expected}")]
    LengthMismatch { expected: usize, found: usize },

    /// The property was never registered as animatable on this layer
    #[error("unknown animatable property: {0}")]
    UnknownProperty(String),

    /// The property is already registered and its accessor is locked
    #[error("animatable property already registered: {0}")]
    AlreadyRegistered(String),

    /// An animation was submitted without a required field
    #[error("animation is missing `{field}`")]
    IncompleteAnimation { field: &'static str },

    /// An animation tried to finish a second time
    #[error("animation for `{property}` cannot finish twice")]
    FinishedTwice { property: String },

    /// A consumer render hook failed
    #[error("render hook failed: {0}")]
    Render(#[from] anyhow::Error),
}

/// Result type for Shoe operations
pub type Result<T> = std::result::Result<T, ShoeError>;
