//! Length and presence checks for handshake inputs.
//!
//! Every handshake step runs these against its inputs before any bytes hit
//! the network, so malformed data fails with a field name instead of a
//! mid-handshake protocol error from the receiver.

use thiserror::Error;

/// Validation failures. Always raised synchronously, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A byte buffer had the wrong length.
    #[error("{name} has length {actual} (expected {expected})")]
    BufferLength {
        /// Field name
        name: &'static str,
        /// Required length in bytes
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// A byte buffer was shorter than the minimum.
    #[error("{name} has length {actual} (expected at least {min})")]
    BufferTooShort {
        /// Field name
        name: &'static str,
        /// Minimum length in bytes
        min: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// A string had the wrong number of characters.
    #[error("{name} has {actual} characters (expected {expected})")]
    StringLength {
        /// Field name
        name: &'static str,
        /// Required length in characters
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// A string was shorter than the minimum.
    #[error("{name} has {actual} characters (expected at least {min})")]
    StringTooShort {
        /// Field name
        name: &'static str,
        /// Minimum length in characters
        min: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// A required value was not set.
    #[error("{name} is not set")]
    Missing {
        /// Field name
        name: &'static str,
    },

    /// A stored value could not be decoded.
    #[error("{name} is not valid base64")]
    Encoding {
        /// Field name
        name: &'static str,
    },
}

/// Length constraint for [`assert_buffer`] and [`assert_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// Exactly this many bytes/characters.
    Exactly(usize),
    /// At least this many bytes/characters.
    AtLeast(usize),
}

/// Check a byte buffer against a length constraint.
///
/// # Errors
///
/// Returns [`ValidationError`] naming the field and the violated constraint.
pub fn assert_buffer(
    buffer: &[u8],
    name: &'static str,
    length: Length,
) -> Result<(), ValidationError> {
    match length {
        Length::Exactly(expected) if buffer.len() != expected => {
            Err(ValidationError::BufferLength {
                name,
                expected,
                actual: buffer.len(),
            })
        }
        Length::AtLeast(min) if buffer.len() < min => Err(ValidationError::BufferTooShort {
            name,
            min,
            actual: buffer.len(),
        }),
        _ => Ok(()),
    }
}

/// Check a string against a length constraint (counted in characters).
///
/// # Errors
///
/// Returns [`ValidationError`] naming the field and the violated constraint.
pub fn assert_string(
    value: &str,
    name: &'static str,
    length: Length,
) -> Result<(), ValidationError> {
    let chars = value.chars().count();
    match length {
        Length::Exactly(expected) if chars != expected => Err(ValidationError::StringLength {
            name,
            expected,
            actual: chars,
        }),
        Length::AtLeast(min) if chars < min => Err(ValidationError::StringTooShort {
            name,
            min,
            actual: chars,
        }),
        _ => Ok(()),
    }
}

/// Unwrap an optional value, failing with the field name when absent.
///
/// # Errors
///
/// Returns [`ValidationError::Missing`] when the value is `None`.
pub fn require<T>(value: Option<T>, name: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::Missing { name })
}
