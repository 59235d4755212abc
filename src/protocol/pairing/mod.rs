//! Trust establishment: PIN pairing and per-connection verification.
//!
//! Pairing ([`PinPairing`]) runs once per receiver and registers the
//! client's static public key via an SRP exchange keyed on an on-screen
//! PIN. Verification ([`ConnectionVerifier`]) runs once per connection and
//! re-proves possession of the paired key without a PIN.
//!
//! Both are modeled as tagged state machines: each step consumes exactly
//! the state the previous step produced, and out-of-order calls fail with
//! [`AirPlayError::InvalidState`](crate::AirPlayError::InvalidState)
//! instead of tripping over unset fields.

pub mod setup;
pub mod verify;


pub use setup::{PinPairing, SetupStage};
pub use verify::ConnectionVerifier;
