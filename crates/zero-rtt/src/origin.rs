use serde::{Deserialize, Serialize};

/// The `(host, port)` pair a session ticket is scoped to. Tickets are
/// never valid across origins; this is the store's primary key.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct Origin {
    /// Hostname, as used in the connection URI (not IP-resolved).
    pub host: String,
    /// TCP/UDP port.
    pub port: u16,
}

impl Origin {
    /// Build an origin from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
