use thiserror::Error;

use crate::protocol::crypto::CryptoError;
use crate::protocol::plist::{PlistDecodeError, PlistEncodeError};
use crate::transport::TransportError;
use crate::validate::ValidationError;

/// Errors that can occur during `AirPlay` operations
#[derive(Debug, Error)]
pub enum AirPlayError {
    /// Malformed input or state, caught before any network I/O
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// HTTP status or connection failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Binary plist encoding/decoding failed
    #[error("codec error: {message}")]
    Codec {
        /// Description of the error
        message: String,
    },

    /// Handshake response was structurally invalid
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error
        message: String,
    },

    /// The receiver rejected the SRP proof at pairing step 2.
    ///
    /// The one recoverable handshake failure: re-invoke
    /// [`enter_pin`](crate::AirPlayClient::enter_pin) with a fresh PIN. The
    /// key/salt exchange from step 1 stays valid.
    #[error("invalid PIN (receiver answered {status})")]
    InvalidPin {
        /// HTTP status the receiver answered with
        status: u16,
    },

    /// A handshake step was called out of order
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// The state the operation requires
        expected: &'static str,
        /// The state the machine was actually in
        actual: &'static str,
    },

    /// A playback command was issued without a verified session on the
    /// current connection. Run [`verify`](crate::AirPlayClient::verify)
    /// (again, if the connection dropped).
    #[error("session not verified for the current connection")]
    SessionNotVerified,

    /// Cryptographic operation failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<PlistDecodeError> for AirPlayError {
    fn from(err: PlistDecodeError) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }
}

impl From<PlistEncodeError> for AirPlayError {
    fn from(err: PlistEncodeError) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }
}

impl AirPlayError {
    /// Check if this error is recoverable by retrying the failing step.
    ///
    /// Only the wrong-PIN rejection is documented as retry-eligible; every
    /// other handshake failure requires restarting the handshake.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidPin { .. })
    }

    /// Check if this error indicates the transport connection is gone.
    ///
    /// Verification state lives on the connection, so a `true` here means
    /// the session must be re-verified after reconnecting.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::Io(_) | TransportError::ConnectionClosed)
        )
    }
}

/// Result type alias for `AirPlay` operations
pub type Result<T> = std::result::Result<T, AirPlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AirPlayError::InvalidPin { status: 470 };
        assert_eq!(err.to_string(), "invalid PIN (receiver answered 470)");

        let err = AirPlayError::InvalidState {
            expected: "KeysReceived",
            actual: "Idle",
        };
        assert_eq!(
            err.to_string(),
            "invalid state: expected KeysReceived, got Idle"
        );
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(AirPlayError::InvalidPin { status: 470 }.is_recoverable());
        assert!(!AirPlayError::SessionNotVerified.is_recoverable());
        assert!(
            !AirPlayError::Protocol {
                message: "short response".to_string(),
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_error_is_connection_lost() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = AirPlayError::Transport(TransportError::Io(io_err));
        assert!(err.is_connection_lost());

        let err = AirPlayError::Transport(TransportError::Status { status: 404 });
        assert!(!err.is_connection_lost());
    }

    #[test]
    fn test_error_from_validation() {
        let err: AirPlayError = ValidationError::Missing { name: "pin" }.into();
        assert!(matches!(err, AirPlayError::Validation(_)));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AirPlayError>();
    }
}
