//! Testing utilities.
//!
//! [`MockReceiver`] is a minimal in-process `AirPlay` receiver: a TCP HTTP
//! server with scripted per-path responses and a request log, used to test
//! handshakes and commands without real hardware.

mod mock_receiver;

pub use mock_receiver::{MockReceiver, MockResponse, ReceivedRequest};
