//! Parsing of cached `host:port` actor addresses.

use std::fmt;
use std::str::FromStr;

/// Reasons a cached address cannot be turned into a [`PeerAddr`].
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum AddressError {
    #[error("Address {0:?} has no ':' delimiter")]
    MissingDelimiter(String),
    #[error("Address {0:?} has more than one ':' delimiter")]
    TooManyDelimiters(String),
    #[error("Address {0:?} has an empty host")]
    EmptyHost(String),
    #[error("Address {0:?} has whitespace in its host")]
    InvalidHost(String),
    #[error("Address {0:?} has an invalid port")]
    InvalidPort(String),
}

/// A resolved point-to-point target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    pub host: String,
    pub port: u16,
}

impl PeerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for PeerAddr {
    type Err = AddressError;

    /// Strict two-part parse: exactly one `:`, a non-empty host without whitespace, and a
    /// `u16` port.
    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let mut parts = address.split(':');
        let (host, port) = match (parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(port), None) => (host, port),
            (_, None, _) => return Err(AddressError::MissingDelimiter(address.to_string())),
            _ => return Err(AddressError::TooManyDelimiters(address.to_string())),
        };

        if host.is_empty() {
            return Err(AddressError::EmptyHost(address.to_string()));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(AddressError::InvalidHost(address.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidPort(address.to_string()))?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
