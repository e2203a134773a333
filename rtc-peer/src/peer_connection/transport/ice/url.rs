use std::fmt;

use super::protocol::RTCIceProtocol;
use shared::error::{Error, Result};

/// SchemeType indicates the type of server used in the ice.URL structure.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchemeType {
    #[default]
    Unknown,
    Stun,
    Stuns,
    Turn,
    Turns,
}

impl From<&str> for SchemeType {
    fn from(raw: &str) -> Self {
        match raw {
            "stun" => SchemeType::Stun,
            "stuns" => SchemeType::Stuns,
            "turn" => SchemeType::Turn,
            "turns" => SchemeType::Turns,
            _ => SchemeType::Unknown,
        }
    }
}

impl fmt::Display for SchemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SchemeType::Stun => "stun",
            SchemeType::Stuns => "stuns",
            SchemeType::Turn => "turn",
            SchemeType::Turns => "turns",
            SchemeType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl SchemeType {
    fn is_secure(self) -> bool {
        matches!(self, SchemeType::Stuns | SchemeType::Turns)
    }

    fn default_port(self) -> u16 {
        if self.is_secure() {
            5349
        } else {
            3478
        }
    }
}

/// IceUrl is a parsed STUN or TURN server address (RFC 7064, RFC 7065).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct IceUrl {
    pub scheme: SchemeType,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub proto: RTCIceProtocol,
}

impl fmt::Display for IceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if matches!(self.scheme, SchemeType::Turn | SchemeType::Turns) {
            write!(
                f,
                "{}:{}:{}?transport={}",
                self.scheme, host, self.port, self.proto
            )
        } else {
            write!(f, "{}:{}:{}", self.scheme, host, self.port)
        }
    }
}

impl IceUrl {
    /// parse parses a STUN or TURN url following the ABNF syntax described in
    /// <https://tools.ietf.org/html/rfc7064> and <https://tools.ietf.org/html/rfc7065>.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || Error::ErrICEInvalidUrl(raw.to_owned());

        let parsed = url::Url::parse(raw)?;
        let scheme = SchemeType::from(parsed.scheme());
        if scheme == SchemeType::Unknown {
            return Err(invalid());
        }

        // stun/turn urls are opaque, so re-parse the authority part as a hierarchical url
        let authority = parsed.path();
        if authority.is_empty() || authority.contains('/') || authority.contains('@') {
            return Err(invalid());
        }
        let hierarchical = url::Url::parse(&format!("{}://{}", parsed.scheme(), authority))?;
        let host = match hierarchical.host() {
            Some(url::Host::Ipv6(ip)) => ip.to_string(),
            Some(host) => host.to_string(),
            None => return Err(invalid()),
        };
        let port = hierarchical.port().unwrap_or_else(|| scheme.default_port());

        let proto = match scheme {
            SchemeType::Stun | SchemeType::Stuns => {
                if parsed.query().is_some() {
                    return Err(invalid());
                }
                if scheme.is_secure() {
                    RTCIceProtocol::Tcp
                } else {
                    RTCIceProtocol::Udp
                }
            }
            _ => {
                let mut proto = if scheme.is_secure() {
                    RTCIceProtocol::Tcp
                } else {
                    RTCIceProtocol::Udp
                };
                if let Some(query) = parsed.query() {
                    let mut pairs = query.splitn(2, '=');
                    match (pairs.next(), pairs.next()) {
                        (Some("transport"), Some(value)) => {
                            proto = RTCIceProtocol::from(value);
                            if proto == RTCIceProtocol::Unspecified {
                                return Err(invalid());
                            }
                        }
                        _ => return Err(invalid()),
                    }
                }
                proto
            }
        };

        Ok(IceUrl {
            scheme,
            host,
            port,
            username: String::new(),
            password: String::new(),
            proto,
        })
    }

    pub fn is_secure(&self) -> bool {
        self.scheme.is_secure()
    }

    pub fn is_turn(&self) -> bool {
        matches!(self.scheme, SchemeType::Turn | SchemeType::Turns)
    }
}
