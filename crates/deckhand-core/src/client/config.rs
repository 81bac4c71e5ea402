use serde::{Deserialize, Serialize};

/// The configured Galactic AI server.
///
/// Immutable once a session is established; changed only by an explicit
/// reconfiguration (new login or pairing).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    /// Hostname or IP address
    pub host: String,
    /// Server port (pairing payloads typically advertise 17789)
    pub port: u16,
    /// Whether to connect over HTTPS with TOFU verification
    pub use_tls: bool,
}

/// Endpoint construction failure (empty host or port 0).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid server endpoint: {0}")]
pub struct InvalidEndpoint(pub &'static str);

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool) -> Result<Self, InvalidEndpoint> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(InvalidEndpoint("host must be non-empty"));
        }
        if port == 0 {
            return Err(InvalidEndpoint("port must be in 1-65535"));
        }
        Ok(Self { host, port, use_tls })
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_follows_tls_flag() {
        let plain = ServerEndpoint::new("192.168.1.5", 17789, false).unwrap();
        assert_eq!(plain.base_url(), "http://192.168.1.5:17789");
        let tls = ServerEndpoint::new("deck.local", 443, true).unwrap();
        assert_eq!(tls.base_url(), "https://deck.local:443");
    }

    #[test]
    fn rejects_empty_host_and_zero_port() {
        assert!(ServerEndpoint::new("", 17789, false).is_err());
        assert!(ServerEndpoint::new("   ", 17789, false).is_err());
        assert!(ServerEndpoint::new("host", 0, false).is_err());
    }
}
