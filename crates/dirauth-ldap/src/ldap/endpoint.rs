//! LDAP endpoint resolution
//!
//! Normalizes the configured `ldap_url` into a protocol, host and port.
//! Accepted forms include a bare host, `host:port` and `scheme://host[:port]`.
//! An explicit port 636 always selects ldaps, whatever scheme was declared.

use dirauth_core::{Error, Result, LDAPS_PORT, LDAP_PORT};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ldap,
    Ldaps,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Ldap => "ldap",
            Protocol::Ldaps => "ldaps",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Ldap => LDAP_PORT,
            Protocol::Ldaps => LDAPS_PORT,
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Protocol::Ldaps)
    }
}

/// A resolved directory endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Resolve a raw configuration string
    pub fn resolve(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_url(raw, "empty url"));
        }

        let (mut protocol, hostport) = match trimmed.split_once("://") {
            Some((scheme, rest)) => {
                let protocol = if scheme.eq_ignore_ascii_case("ldap") {
                    Protocol::Ldap
                } else if scheme.eq_ignore_ascii_case("ldaps") {
                    Protocol::Ldaps
                } else {
                    return Err(Error::invalid_url(raw, "unknown ldap protocol"));
                };
                (protocol, rest)
            }
            None => (Protocol::Ldap, trimmed),
        };

        let hostport = hostport.strip_suffix('/').unwrap_or(hostport);
        if hostport
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '@') || c.is_whitespace())
        {
            return Err(Error::invalid_url(raw, "expected host[:port] only"));
        }

        let (host, port) =
            split_host_port(hostport).map_err(|reason| Error::invalid_url(raw, reason))?;

        let port = match port {
            Some(port) => {
                if port == LDAPS_PORT {
                    protocol = Protocol::Ldaps;
                }
                port
            }
            None => protocol.default_port(),
        };

        let endpoint = Self {
            protocol,
            host: host.to_string(),
            port,
        };

        let parsed = Url::parse(&endpoint.to_string())
            .map_err(|e| Error::invalid_url(raw, format!("illegal ldap url: {}", e)))?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(Error::invalid_url(raw, "missing host"));
        }

        Ok(endpoint)
    }

    pub fn is_tls(&self) -> bool {
        self.protocol.is_tls()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.protocol.scheme(), self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.protocol.scheme(), self.host, self.port)
        }
    }
}

fn split_host_port(hostport: &str) -> std::result::Result<(&str, Option<u16>), String> {
    let (host, port) = if let Some(rest) = hostport.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| "missing ']' in address".to_string())?;
        if after.is_empty() {
            (host, None)
        } else {
            let port = after
                .strip_prefix(':')
                .ok_or_else(|| "unexpected characters after address".to_string())?;
            (host, Some(port))
        }
    } else {
        match hostport.matches(':').count() {
            0 => (hostport, None),
            1 => match hostport.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (hostport, None),
            },
            _ => return Err("too many colons in address".to_string()),
        }
    };

    if host.is_empty() {
        return Err("missing host".to_string());
    }

    let port = match port {
        Some(p) => {
            let port: u16 = p
                .parse()
                .map_err(|_| format!("invalid port {:?}", p))?;
            if port == 0 {
                return Err("invalid port 0".to_string());
            }
            Some(port)
        }
        None => None,
    };

    Ok((host, port))
}
