use std::fmt;
use std::str::FromStr;

use crate::error::PicsendError;

/// Address of a receiver: a host name or IP literal plus a TCP port.
///
/// Construction validates both parts, so a value of this type is always
/// safe to hand to [`TransferClient`](super::TransferClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Build an endpoint from a host and port.
    ///
    /// Surrounding whitespace and IPv6 brackets are stripped from the host.
    pub fn new(host: impl AsRef<str>, port: u16) -> Result<Self, PicsendError> {
        let host = host.as_ref().trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return Err(PicsendError::InvalidEndpoint("host is empty".into()));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(PicsendError::InvalidEndpoint(format!(
                "host contains whitespace: {host:?}"
            )));
        }
        if port == 0 {
            return Err(PicsendError::InvalidEndpoint(
                "port must be between 1 and 65535".into(),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Build an endpoint from the two free-text fields a form exposes.
    pub fn from_fields(host: &str, port: &str) -> Result<Self, PicsendError> {
        let port = parse_port(port)?;
        Self::new(host, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

fn parse_port(text: &str) -> Result<u16, PicsendError> {
    let text = text.trim();
    text.parse::<u16>()
        .map_err(|_| PicsendError::InvalidEndpoint(format!("invalid port: {text:?}")))
}

impl FromStr for Endpoint {
    type Err = PicsendError;

    /// Parse `host:port` or `[v6-address]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| PicsendError::InvalidEndpoint(format!("missing port in {s:?}")))?;

        // A bare IPv6 literal without brackets is ambiguous.
        if host.contains(':') && !host.starts_with('[') {
            return Err(PicsendError::InvalidEndpoint(format!(
                "IPv6 addresses must be bracketed: {s:?}"
            )));
        }

        Self::from_fields(host, port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
