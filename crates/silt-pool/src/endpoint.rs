use std::fmt;

use serde::{Deserialize, Serialize};

/// One store node the pool may dial.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Match by host, optionally narrowed to one port.
    pub fn matches(&self, host: &str, port: Option<u16>) -> bool {
        self.host == host && port.map_or(true, |p| self.port == p)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
