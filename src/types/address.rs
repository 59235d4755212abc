use std::fmt;
use std::net::SocketAddr;

/// TCP port `AirPlay` receivers listen on for HTTP control traffic.
pub const DEFAULT_PORT: u16 = 7000;

/// Network address of an `AirPlay` receiver.
///
/// Discovery is out of scope for this crate; the caller supplies the
/// address (typically from mDNS browsing or user input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverAddress {
    /// Host name or IP address
    pub host: String,
    /// Control port (7000 unless the receiver advertises otherwise)
    pub port: u16,
}

impl ReceiverAddress {
    /// Address on the standard control port.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
        }
    }

    /// Address on a non-standard port.
    pub fn with_port(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` form used for connecting and the HTTP `Host` header.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for ReceiverAddress {
    fn from(addr: SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for ReceiverAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
